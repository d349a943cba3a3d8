use crate::command::ExitCode;
use crate::history::History;
use std::collections::HashMap;
use std::env as stdenv;
use std::ffi::CString;
use std::path::{Path, PathBuf};

/// Mutable, session-level state shared by every command on every line.
///
/// The environment contains:
/// - `vars`: environment variables; they are what spawned programs see.
/// - `current_dir`: the working directory; empty when it could not be determined.
/// - `history`: entries for the `history` builtin.
/// - `exit_code`: set by `exit` to ask the interactive loop to terminate.
///
/// Tests build one by hand with fake values instead of touching the process.
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub current_dir: PathBuf,
    pub history: History,
    pub exit_code: Option<ExitCode>,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    pub fn new() -> Self {
        Self {
            vars: stdenv::vars().collect(),
            current_dir: stdenv::current_dir().unwrap_or_default(),
            history: History::new(),
            exit_code: None,
        }
    }

    /// Environment with no variables, rooted at `current_dir`.
    pub fn empty(current_dir: impl Into<PathBuf>) -> Self {
        Self {
            vars: HashMap::new(),
            current_dir: current_dir.into(),
            history: History::new(),
            exit_code: None,
        }
    }

    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Resolve `path` against the session working directory.
    pub fn absolute(&self, path: &Path) -> PathBuf {
        self.current_dir.join(path)
    }

    /// `KEY=VALUE` strings for `execve`. Pairs containing a NUL byte are skipped.
    pub fn envp(&self) -> Vec<CString> {
        self.vars
            .iter()
            .filter_map(|(k, v)| CString::new(format!("{}={}", k, v)).ok())
            .collect()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
