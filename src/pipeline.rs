//! Process orchestration: fork one child per stage, wire pipes between them,
//! and reap every child.
//!
//! A stage is either an external program (replaced via `execve`), a builtin
//! (run in the child, which then exits with its status) or a name that did not
//! resolve (the child reports it and exits 1). The wiring code treats all three
//! the same way.

use crate::command::{ExecutableCommand, ExitCode};
use crate::env::Environment;
use crate::error::{ParseError, ResolutionError, ShellError, SystemError};
use crate::parser::Command;
use crate::redirect;
use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{self, ForkResult, Pid};
use std::ffi::CString;
use std::io::{self, Write};
use std::os::fd::{AsRawFd, OwnedFd};
use std::path::{Path, PathBuf};

/// Status of a program that resolved but could not be executed.
const EXEC_FAILED: ExitCode = 126;

/// What a stage turns into once its command name has been resolved.
pub enum Launch {
    Builtin(Box<dyn ExecutableCommand>),
    External(PathBuf),
    NotFound,
}

impl Launch {
    pub fn is_builtin(&self) -> bool {
        matches!(self, Launch::Builtin(_))
    }
}

/// One resolved pipeline stage.
pub struct Stage<'a> {
    pub command: &'a Command,
    pub launch: Launch,
}

/// Everything `execve` needs, built before forking.
struct ExecImage {
    path: CString,
    argv: Vec<CString>,
}

impl ExecImage {
    fn new(path: &Path, command: &Command) -> Result<Self, ParseError> {
        use std::os::unix::ffi::OsStrExt;
        let path = CString::new(path.as_os_str().as_bytes()).map_err(|_| ParseError::InteriorNul)?;
        let argv = command
            .argv
            .iter()
            .map(|a| CString::new(a.as_bytes()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ParseError::InteriorNul)?;
        Ok(Self { path, argv })
    }
}

enum Prepared<'a> {
    Builtin(Box<dyn ExecutableCommand>),
    External(ExecImage),
    NotFound(&'a str),
}

/// Outcome of a launched pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRun {
    /// Children forked for this pipeline.
    pub spawned: usize,
    /// Exit status of every reaped child, in stage order.
    pub statuses: Vec<ExitCode>,
}

impl PipelineRun {
    /// The pipeline reports the status of its last stage.
    pub fn exit_code(&self) -> ExitCode {
        self.statuses.last().copied().unwrap_or(1)
    }
}

/// How spawned children treat `SIGINT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildSignals {
    /// Leave dispositions as inherited.
    Inherit,
    /// Put `SIGINT` back to its default before running the stage.
    ResetInterrupt,
}

/// Run `stages` as one pipeline and wait for all of them.
///
/// Arguments are converted for `execve` before anything is forked. Children
/// are always reaped, even when setting up a later stage fails; in that case
/// the setup error is returned after the wait.
pub fn run(
    stages: Vec<Stage<'_>>,
    env: &mut Environment,
    signals: ChildSignals,
) -> Result<PipelineRun, ShellError> {
    let prepared = prepare(stages)?;
    Ok(spawn_all(prepared, env, signals)?)
}

fn prepare<'a>(stages: Vec<Stage<'a>>) -> Result<Vec<(&'a Command, Prepared<'a>)>, ParseError> {
    stages
        .into_iter()
        .map(|stage| {
            let prepared = match stage.launch {
                Launch::Builtin(cmd) => Prepared::Builtin(cmd),
                Launch::External(path) => Prepared::External(ExecImage::new(&path, stage.command)?),
                Launch::NotFound => Prepared::NotFound(stage.command.name()),
            };
            Ok((stage.command, prepared))
        })
        .collect()
}

fn spawn_all(
    stages: Vec<(&Command, Prepared<'_>)>,
    env: &mut Environment,
    signals: ChildSignals,
) -> Result<PipelineRun, SystemError> {
    let count = stages.len();
    let envp = env.envp();

    let mut pipes: Vec<(OwnedFd, OwnedFd)> = Vec::with_capacity(count.saturating_sub(1));
    for _ in 1..count {
        pipes.push(unistd::pipe().map_err(SystemError::PipeFailed)?);
    }

    // anything still buffered would otherwise be written once per child
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();

    let mut children = Vec::with_capacity(count);
    let mut setup_error = None;
    for (index, (command, prepared)) in stages.into_iter().enumerate() {
        // SAFETY: the shell is single-threaded; the child only touches state
        // prepared before the fork and leaves through `execve` or `_exit`.
        match unsafe { unistd::fork() } {
            Ok(ForkResult::Child) => {
                let pipes = std::mem::take(&mut pipes);
                enter_stage(index, count, pipes, command, prepared, &envp, env, signals);
            }
            Ok(ForkResult::Parent { child }) => {
                debug!("stage {} `{}` forked as pid {}", index, command.name(), child);
                children.push(child);
            }
            Err(errno) => {
                setup_error = Some(SystemError::ForkFailed(errno));
                break;
            }
        }
    }

    // the parent's copies must go, or the last reader never sees end-of-input
    drop(pipes);

    let statuses = reap(&children);
    if let Some(err) = setup_error {
        return Err(err);
    }
    Ok(PipelineRun {
        spawned: children.len(),
        statuses,
    })
}

/// Wait for every child in order, retrying interrupted waits.
fn reap(children: &[Pid]) -> Vec<ExitCode> {
    children
        .iter()
        .map(|&pid| loop {
            match waitpid(pid, None) {
                Ok(status) => {
                    debug!("reaped {:?}", status);
                    break status_code(status);
                }
                Err(Errno::EINTR) => continue,
                Err(e) => {
                    warn!("{}", SystemError::WaitFailed(e));
                    break 1;
                }
            }
        })
        .collect()
}

fn status_code(status: WaitStatus) -> ExitCode {
    match status {
        WaitStatus::Exited(_, code) => code,
        _ => 1,
    }
}

/// Child side of one stage. Never returns.
#[allow(clippy::too_many_arguments)]
fn enter_stage(
    index: usize,
    count: usize,
    pipes: Vec<(OwnedFd, OwnedFd)>,
    command: &Command,
    prepared: Prepared<'_>,
    envp: &[CString],
    env: &mut Environment,
    signals: ChildSignals,
) -> ! {
    let status = match wire(index, count, pipes, command, env, signals) {
        Ok(()) => run_stage(prepared, envp, env),
        Err(e) => {
            eprintln!("{}", e);
            1
        }
    };
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
    // SAFETY: `_exit` skips the parent's atexit handlers, which this copy must not run.
    unsafe { libc::_exit(status) }
}

fn wire(
    index: usize,
    count: usize,
    pipes: Vec<(OwnedFd, OwnedFd)>,
    command: &Command,
    env: &Environment,
    signals: ChildSignals,
) -> Result<(), SystemError> {
    // the runtime ignores SIGPIPE and an ignored disposition survives execve
    let mut restore = vec![Signal::SIGPIPE];
    if signals == ChildSignals::ResetInterrupt {
        restore.push(Signal::SIGINT);
    }
    for sig in restore {
        // SAFETY: installs the default disposition; no handler code is involved.
        if let Err(e) = unsafe { signal::signal(sig, SigHandler::SigDfl) } {
            debug!("resetting {} failed: {}", sig, e);
        }
    }
    if index > 0 {
        let read_end = pipes[index - 1].0.as_raw_fd();
        unistd::dup2(read_end, libc::STDIN_FILENO).map_err(SystemError::Dup2Failed)?;
    }
    if index + 1 < count {
        let write_end = pipes[index].1.as_raw_fd();
        unistd::dup2(write_end, libc::STDOUT_FILENO).map_err(SystemError::Dup2Failed)?;
    }
    // every pipe end this child holds besides its stdin/stdout closes here
    drop(pipes);

    redirect::apply(command, &env.current_dir)?;
    if !env.current_dir.as_os_str().is_empty() {
        if let Err(e) = unistd::chdir(&env.current_dir) {
            debug!("chdir {} failed: {}", env.current_dir.display(), e);
        }
    }
    Ok(())
}

fn run_stage(prepared: Prepared<'_>, envp: &[CString], env: &mut Environment) -> ExitCode {
    match prepared {
        Prepared::External(image) => {
            let Err(e) = unistd::execve(&image.path, &image.argv, envp);
            eprintln!("{}: {}", image.path.to_string_lossy(), e.desc());
            EXEC_FAILED
        }
        Prepared::Builtin(cmd) => {
            let (mut stdout, mut stderr) = (io::stdout(), io::stderr());
            cmd.execute(&mut stdout, &mut stderr, env).unwrap_or(1)
        }
        Prepared::NotFound(name) => {
            eprintln!("{}", ResolutionError::NotFound(name.to_string()));
            1
        }
    }
}
