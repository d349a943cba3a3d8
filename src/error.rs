//! Error taxonomy for one input line.
//!
//! Every error here is recovered at the granularity of a single line: the
//! interpreter reports it on standard error and goes back to the prompt.

use nix::errno::Errno;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Which quote was left open when the input ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteKind {
    Single,
    Double,
}

impl fmt::Display for QuoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteKind::Single => f.write_str("single"),
            QuoteKind::Double => f.write_str("double"),
        }
    }
}

/// Malformed input; nothing from the offending line is executed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("syntax error: unclosed {0} quote")]
    UnclosedQuote(QuoteKind),

    #[error("syntax error: expected a file name after `{0}`")]
    MissingRedirectTarget(String),

    #[error("syntax error: empty command in pipeline stage {0}")]
    EmptyPipelineStage(usize),

    #[error("syntax error: redirection without a command")]
    MissingCommand,

    #[error("syntax error: argument contains a NUL byte")]
    InteriorNul,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("{0}: command not found")]
    NotFound(String),
}

/// Operating-system failures while wiring or running a pipeline.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("fork failed: {0}")]
    ForkFailed(#[source] Errno),

    #[error("pipe failed: {0}")]
    PipeFailed(#[source] Errno),

    #[error("{}: {source}", .path.display())]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("dup2 failed: {0}")]
    Dup2Failed(#[source] Errno),

    #[error("wait failed: {0}")]
    WaitFailed(#[source] Errno),
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    System(#[from] SystemError),
}

impl ShellError {
    /// Status reported to the prompt when a line fails before or while running.
    pub fn exit_code(&self) -> crate::command::ExitCode {
        match self {
            ShellError::Parse(_) => 2,
            ShellError::Resolution(_) | ShellError::System(_) => 1,
        }
    }
}
