//! Turns a raw input line into a [`Pipeline`] of [`Command`]s.
//!
//! Parsing happens in three steps: the line is cut at every `|` byte, each
//! segment is tokenized on its own, and the redirection operators are pulled out
//! of each segment's arguments.
//!
//! The cut happens before tokenization and does not look at quotes, so a `|`
//! inside quotes still separates two stages (`echo 'a|b'` is two broken
//! segments and fails with an unclosed quote).

use crate::error::ParseError;
use crate::lexer;
use log::{debug, warn};
use std::path::PathBuf;

/// Which standard stream a redirection replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    pub fn fd(self) -> i32 {
        match self {
            Stream::Stdout => libc::STDOUT_FILENO,
            Stream::Stderr => libc::STDERR_FILENO,
        }
    }
}

/// How the redirection target is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    /// `>`: clear existing content.
    Truncate,
    /// `>>`: keep existing content and write at the end.
    Append,
}

/// One output redirection. The target is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub path: PathBuf,
    pub mode: RedirectMode,
}

/// A single pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Program or builtin name followed by its arguments; never empty.
    pub argv: Vec<String>,
    pub stdout: Option<Redirect>,
    pub stderr: Option<Redirect>,
}

impl Command {
    pub fn name(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    /// Redirections in the order they are installed.
    pub fn redirects(&self) -> impl Iterator<Item = (Stream, &Redirect)> {
        self.stdout
            .iter()
            .map(|r| (Stream::Stdout, r))
            .chain(self.stderr.iter().map(|r| (Stream::Stderr, r)))
    }
}

/// Commands connected by pipes, in execution order; never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
}

impl Pipeline {
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Map a token to the redirection it introduces, if it is an operator.
fn redirect_operator(token: &str) -> Option<(Stream, RedirectMode)> {
    match token {
        ">" | "1>" => Some((Stream::Stdout, RedirectMode::Truncate)),
        ">>" | "1>>" => Some((Stream::Stdout, RedirectMode::Append)),
        "2>" => Some((Stream::Stderr, RedirectMode::Truncate)),
        "2>>" => Some((Stream::Stderr, RedirectMode::Append)),
        _ => None,
    }
}

/// Split a raw line at every `|` byte, keeping each segment's text intact.
///
/// The number of segments is always the number of `|` characters plus one.
pub fn split_pipeline(line: &str) -> Vec<&str> {
    line.split('|').collect()
}

/// Pull the redirection chain out of a tokenized command.
///
/// Everything before the first operator is the command's argument vector. From
/// the first operator on, each operator consumes the next token as its target and
/// a later operator for the same stream replaces an earlier one. Words in the
/// chain that are neither an operator nor a target are dropped.
pub fn extract_redirections(mut tokens: Vec<String>) -> Result<Command, ParseError> {
    let first_op = tokens.iter().position(|t| redirect_operator(t).is_some());
    let chain = match first_op {
        Some(i) => tokens.split_off(i),
        None => Vec::new(),
    };

    let mut stdout = None;
    let mut stderr = None;
    let mut chain = chain.into_iter();
    while let Some(token) = chain.next() {
        let Some((stream, mode)) = redirect_operator(&token) else {
            warn!("ignoring `{}` after redirection", token);
            continue;
        };
        let target = match chain.next() {
            Some(t) if !t.is_empty() && redirect_operator(&t).is_none() => t,
            _ => return Err(ParseError::MissingRedirectTarget(token)),
        };
        let redirect = Some(Redirect {
            path: PathBuf::from(target),
            mode,
        });
        match stream {
            Stream::Stdout => stdout = redirect,
            Stream::Stderr => stderr = redirect,
        }
    }

    if tokens.is_empty() {
        return Err(ParseError::MissingCommand);
    }
    Ok(Command {
        argv: tokens,
        stdout,
        stderr,
    })
}

/// Parse a whole input line.
///
/// Returns `Ok(None)` for a line with nothing to run (empty or blank). A
/// segment with no words in a multi-stage line fails the whole pipeline.
pub fn parse_line(line: &str) -> Result<Option<Pipeline>, ParseError> {
    let segments = split_pipeline(line);
    let mut commands = Vec::with_capacity(segments.len());
    for (index, segment) in segments.iter().enumerate() {
        let tokens = lexer::split_into_args(segment)?;
        if tokens.is_empty() {
            if segments.len() == 1 {
                return Ok(None);
            }
            return Err(ParseError::EmptyPipelineStage(index));
        }
        commands.push(extract_redirections(tokens)?);
    }
    debug!("parsed pipeline: {:?}", commands);
    Ok(Some(Pipeline { commands }))
}
