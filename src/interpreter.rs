use crate::command::{CommandFactory, ExitCode};
use crate::env::Environment;
use crate::error::ShellError;
use crate::external::find_command_path;
use crate::parser::{self, Command, Pipeline};
use crate::pipeline::{self, ChildSignals, Launch, Stage};
use crate::redirect::RedirectGuard;
use log::{debug, warn};
use nix::sys::signal::{self, SigHandler, Signal};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::ffi::OsStr;
use std::io;
use std::path::PathBuf;

const PROMPT: &str = "$ ";

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports builtins defined in this crate; external programs are resolved
/// separately through PATH.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// A minimal shell that runs one input line at a time.
///
/// The interpreter owns the session [`Environment`] and the list of builtin
/// [`CommandFactory`] objects. Each line is parsed into a pipeline whose stages
/// are resolved to a builtin, an executable on PATH, or nothing at all.
///
/// Example
/// ```no_run
/// use minish::Interpreter;
/// let mut sh = Interpreter::default();
/// let code = sh.execute_line("echo hello world");
/// assert_eq!(code, 0);
/// ```
pub struct Interpreter {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
    history_file: Option<PathBuf>,
    child_signals: ChildSignals,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of builtin factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            env: Environment::new(),
            commands,
            history_file: None,
            child_signals: ChildSignals::Inherit,
        }
    }

    /// Replace the session environment.
    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// File the history is loaded from at startup and appended to on exit.
    pub fn with_history_file(mut self, path: Option<PathBuf>) -> Self {
        self.history_file = path;
        self
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Status requested by `exit`, once it has run.
    pub fn exit_code(&self) -> Option<ExitCode> {
        self.env.exit_code
    }

    /// Run one input line, reporting any failure on standard error.
    ///
    /// Returns the status of the line: the last stage's status, 0 for an empty
    /// line, 2 for a parse error, 1 for a system error.
    pub fn execute_line(&mut self, line: &str) -> ExitCode {
        match self.try_execute_line(line) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("{}", e);
                e.exit_code()
            }
        }
    }

    pub fn try_execute_line(&mut self, line: &str) -> Result<ExitCode, ShellError> {
        match parser::parse_line(line)? {
            Some(pipeline) => self.run_pipeline(&pipeline),
            None => Ok(0),
        }
    }

    /// Run a parsed pipeline.
    ///
    /// A lone builtin runs inside the shell process with its redirections
    /// installed around it; everything else is forked.
    pub fn run_pipeline(&mut self, pipeline: &Pipeline) -> Result<ExitCode, ShellError> {
        if let [command] = pipeline.commands.as_slice() {
            return match self.launch_for(command) {
                Launch::Builtin(cmd) => {
                    let _guard = RedirectGuard::install(command, &self.env.current_dir)?;
                    let (mut stdout, mut stderr) = (io::stdout(), io::stderr());
                    Ok(cmd
                        .execute(&mut stdout, &mut stderr, &mut self.env)
                        .unwrap_or_else(|e| {
                            warn!("{}: {}", command.name(), e);
                            1
                        }))
                }
                launch => self.spawn(vec![Stage { command, launch }]),
            };
        }

        let stages = pipeline
            .commands
            .iter()
            .map(|command| Stage {
                command,
                launch: self.launch_for(command),
            })
            .collect();
        self.spawn(stages)
    }

    fn spawn(&mut self, stages: Vec<Stage<'_>>) -> Result<ExitCode, ShellError> {
        let run = pipeline::run(stages, &mut self.env, self.child_signals)?;
        debug!("pipeline statuses: {:?}", run.statuses);
        Ok(run.exit_code())
    }

    /// Resolve a command to a builtin, an executable on PATH, or nothing.
    fn launch_for(&self, command: &Command) -> Launch {
        let args: Vec<&str> = command.args().iter().map(String::as_str).collect();
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(command.name(), &args) {
                return Launch::Builtin(cmd);
            }
        }
        let search_paths = self.env.get_var("PATH").unwrap_or_default();
        match find_command_path(OsStr::new(search_paths), command.name()) {
            Some(path) => {
                debug!("{} resolved to {}", command.name(), path.display());
                Launch::External(path)
            }
            None => Launch::NotFound,
        }
    }

    fn load_history(&mut self) {
        let Some(path) = &self.history_file else { return };
        match self.env.history.load(path) {
            Ok(count) => debug!("loaded {} history entries from {}", count, path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("cannot read history file {}: {}", path.display(), e),
        }
    }

    /// Append the entries added this session to the history file.
    pub fn persist_history(&mut self) {
        let Some(path) = &self.history_file else { return };
        if let Err(e) = self.env.history.append_to(path) {
            warn!("cannot write history file {}: {}", path.display(), e);
        }
    }

    /// Interactive Read-Eval-Print Loop.
    ///
    /// Returns the status to exit with: the one given to `exit`, or 0 at end of input.
    pub fn repl(&mut self) -> rustyline::Result<ExitCode> {
        let mut rl = DefaultEditor::new()?;
        self.load_history();
        for entry in self.env.history.entries() {
            rl.add_history_entry(entry.as_str())?;
        }

        // SAFETY: ignoring a signal installs no handler code.
        if let Err(e) = unsafe { signal::signal(Signal::SIGINT, SigHandler::SigIgn) } {
            warn!("cannot ignore SIGINT: {}", e);
        }
        self.child_signals = ChildSignals::ResetInterrupt;

        loop {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                        self.env.history.push(line.as_str());
                    }
                    let code = self.execute_line(&line);
                    debug!("status {}", code);
                    if let Some(code) = self.env.exit_code {
                        self.persist_history();
                        return Ok(code);
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => {
                    self.persist_history();
                    return Ok(0);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default builtins:
    /// `exit`, `echo`, `type`, `pwd`, `cd`, `history`.
    fn default() -> Self {
        use crate::builtin::*;
        Self::new(vec![
            Box::new(Factory::<Exit>::default()),
            Box::new(Factory::<Echo>::default()),
            Box::new(Factory::<Type>::default()),
            Box::new(Factory::<Pwd>::default()),
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<HistoryCmd>::default()),
        ])
    }
}
