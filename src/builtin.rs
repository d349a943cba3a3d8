use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::env::Environment;
use crate::external::find_command_path;
use crate::interpreter::Factory;
use anyhow::{Result, bail};
use argh::{EarlyExit, FromArgs};
use std::ffi::OsStr;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Names of every command that runs inside the shell instead of being looked up on PATH.
pub const BUILTIN_NAMES: [&str; 6] = ["exit", "echo", "type", "pwd", "cd", "history"];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

/// Built-in commands known to the shell at compile time.
///
/// Builtins are executed directly in-process without spawning a child process.
/// Most parse their arguments with [`argh`]; `echo` and `exit` take raw words.
pub(crate) trait BuiltinCommand: Sized {
    /// Canonical name of the command, e.g. "echo" or "cd".
    fn name() -> &'static str;

    /// Build the command from the words following its name.
    fn parse(args: &[&str]) -> Result<Self, EarlyExit>;

    /// Executes the command using provided IO streams and environment.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(
        self,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let result = T::execute(*self, stdout, stderr, env);
        stdout.flush()?;
        match result {
            Ok(x) => Ok(x),
            Err(e) => {
                writeln!(stderr, "{}", e)?;
                Ok(1)
            }
        }
    }
}

/// Usage text or argument error produced by `argh` instead of a command.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        if self.is_error {
            writeln!(stderr, "{}", self.output.trim_end())?;
            Ok(1)
        } else {
            writeln!(stdout, "{}", self.output.trim_end())?;
            Ok(0)
        }
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn name(&self) -> &'static str {
        T::name()
    }

    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name != T::name() {
            return None;
        }
        Some(match T::parse(args) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                output,
                is_error: status.is_err(),
            }),
        })
    }
}

/// Short reason for an I/O failure, without the `(os error N)` suffix.
fn reason(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => "No such file or directory".to_string(),
        io::ErrorKind::NotADirectory => "Not a directory".to_string(),
        io::ErrorKind::PermissionDenied => "Permission denied".to_string(),
        _ => err.to_string(),
    }
}

/// Terminate the shell with an optional status.
pub struct Exit {
    pub code: ExitCode,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        // non-numeric codes count as 0; numeric ones wrap into 0..=255
        let code = args
            .first()
            .and_then(|a| a.parse::<i64>().ok())
            .map_or(0, |c| c.rem_euclid(256) as ExitCode);
        Ok(Exit { code })
    }

    fn execute(
        self,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        env.exit_code = Some(self.code);
        Ok(self.code)
    }
}

/// Write the arguments to standard output, separated by spaces.
/// A trailing newline is printed unless `-n` comes first.
pub struct Echo {
    pub no_newline: bool,
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        let flags = args.iter().take_while(|a| **a == "-n").count();
        Ok(Echo {
            no_newline: flags > 0,
            args: args[flags..].iter().map(|a| a.to_string()).collect(),
        })
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        let s = self.args.join(" ");
        if self.no_newline {
            write!(stdout, "{}", s)?;
        } else {
            writeln!(stdout, "{}", s)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Report how each name would be interpreted if used as a command.
pub struct Type {
    #[argh(positional, greedy)]
    /// command names to look up
    pub names: Vec<String>,
}

impl BuiltinCommand for Type {
    fn name() -> &'static str {
        "type"
    }

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        Self::from_args(&[Self::name()], args)
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        if self.names.is_empty() {
            bail!("type: missing argument");
        }
        let search_paths = env.get_var("PATH").unwrap_or_default();
        let mut status = 0;
        for name in &self.names {
            if is_builtin(name) {
                writeln!(stdout, "{} is a shell builtin", name)?;
            } else if let Some(path) = find_command_path(OsStr::new(search_paths), name) {
                writeln!(stdout, "{} is {}", name, path.display())?;
            } else {
                writeln!(stdout, "{}: not found", name)?;
                status = 1;
            }
        }
        Ok(status)
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        Self::from_args(&[Self::name()], args)
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        if env.current_dir.as_os_str().is_empty() {
            bail!("pwd: cannot determine current directory");
        }
        writeln!(stdout, "{}", env.current_dir.display())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute, relative to the current directory, or starting with `~`.
    pub target: Option<String>,
}

impl Cd {
    fn target_dir(&self, env: &Environment) -> Result<PathBuf> {
        let home = || match env.get_var("HOME") {
            Some(h) if !h.is_empty() => Ok(PathBuf::from(h)),
            _ => bail!("cd: HOME not set"),
        };
        match self.target.as_deref() {
            None | Some("") | Some("~") => home(),
            Some(t) => match t.strip_prefix("~/") {
                Some(rest) => Ok(home()?.join(rest)),
                None => Ok(env.absolute(Path::new(t))),
            },
        }
    }
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        Self::from_args(&[Self::name()], args)
    }

    fn execute(
        self,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let new_dir = self.target_dir(env)?;
        let shown = self.target.as_deref().unwrap_or("~");

        let canonical = match fs::canonicalize(&new_dir) {
            Ok(dir) => dir,
            Err(e) => bail!("cd: {}: {}", shown, reason(&e)),
        };
        if let Err(e) = std::env::set_current_dir(&canonical) {
            bail!("cd: {}: {}", shown, reason(&e));
        }

        log::debug!("cd -> {}", canonical.display());
        env.set_var("PWD", canonical.to_string_lossy());
        env.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Display or manipulate the history list.
pub struct HistoryCmd {
    #[argh(option, short = 'r')]
    /// append the contents of a file to the history list
    pub read: Option<PathBuf>,

    #[argh(option, short = 'w')]
    /// write the whole history list to a file, replacing its contents
    pub write: Option<PathBuf>,

    #[argh(option, short = 'a')]
    /// append the entries added since the last write to a file
    pub append: Option<PathBuf>,

    #[argh(positional)]
    /// show only the last N entries
    pub count: Option<usize>,
}

impl BuiltinCommand for HistoryCmd {
    fn name() -> &'static str {
        "history"
    }

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        Self::from_args(&[Self::name()], args)
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let file_ops = [
            (self.read.as_deref(), "-r"),
            (self.write.as_deref(), "-w"),
            (self.append.as_deref(), "-a"),
        ];
        if file_ops.iter().any(|(path, _)| path.is_some()) {
            for (path, flag) in file_ops {
                let Some(path) = path else { continue };
                let path = env.absolute(path);
                let done = match flag {
                    "-r" => env.history.read_from(&path).map(|_| ()),
                    "-w" => env.history.write_to(&path),
                    _ => env.history.append_to(&path),
                };
                if let Err(e) = done {
                    bail!("history: {}: {}", path.display(), reason(&e));
                }
            }
            return Ok(0);
        }

        let count = self.count.unwrap_or(env.history.len());
        for (index, entry) in env.history.tail(count) {
            writeln!(stdout, "{:>5}  {}", index, entry)?;
        }
        Ok(0)
    }
}
