//! A small interactive command shell.
//!
//! A line of input is cut into pipeline stages, each stage is tokenized with
//! shell quoting rules, output redirections are pulled out, and every stage is
//! resolved to a builtin or to an executable found on PATH. Stages then run as
//! forked processes connected by pipes; a lone builtin runs inside the shell
//! with its redirections swapped in around it.
//!
//! The main entry point is [`Interpreter`]. The public modules expose the
//! individual steps so they can be driven and tested on their own.

mod builtin;
pub mod command;
pub mod env;
pub mod error;
pub mod external;
pub mod history;
mod interpreter;
pub mod lexer;
pub mod parser;
pub mod pipeline;
pub mod redirect;

pub use builtin::{BUILTIN_NAMES, is_builtin};
/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API.
pub use interpreter::Interpreter;
