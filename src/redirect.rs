//! Output redirection onto the process's standard descriptors.
//!
//! Children call [`apply`] once and never look back. Builtins that run in the
//! shell process itself go through [`RedirectGuard`], which swaps the
//! descriptors for the duration of the call and puts the originals back when it
//! is dropped, whichever way the builtin returns.

use crate::error::SystemError;
use crate::parser::{Command, Redirect, RedirectMode, Stream};
use log::{debug, warn};
use nix::unistd;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

/// Open a redirection target: created if missing with mode 0644, then truncated
/// or appended to. Relative targets are taken relative to `cwd`.
pub fn open_target(redirect: &Redirect, cwd: &Path) -> Result<File, SystemError> {
    let path = cwd.join(&redirect.path);
    let mut options = OpenOptions::new();
    options.write(true).create(true).mode(0o644);
    match redirect.mode {
        RedirectMode::Truncate => options.truncate(true),
        RedirectMode::Append => options.append(true),
    };
    options
        .open(&path)
        .map_err(|source| SystemError::OpenFailed { path, source })
}

fn flush_std() {
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
}

/// Point the command's redirected streams at their files, for good.
///
/// Runs in a forked child after pipe wiring, so a redirection overrides the pipe
/// for the same stream.
pub fn apply(command: &Command, cwd: &Path) -> Result<(), SystemError> {
    for (stream, redirect) in command.redirects() {
        let file = open_target(redirect, cwd)?;
        unistd::dup2(file.as_raw_fd(), stream.fd()).map_err(SystemError::Dup2Failed)?;
    }
    Ok(())
}

/// Scoped redirection of the shell's own stdout/stderr.
///
/// Holds a duplicate of every descriptor it replaced; dropping the guard flushes
/// buffered output into the redirection target and restores the originals.
#[derive(Debug)]
pub struct RedirectGuard {
    saved: Vec<(Stream, OwnedFd)>,
}

impl RedirectGuard {
    pub fn install(command: &Command, cwd: &Path) -> Result<Self, SystemError> {
        flush_std();
        let mut guard = RedirectGuard { saved: Vec::new() };
        for (stream, redirect) in command.redirects() {
            let file = open_target(redirect, cwd)?;
            let saved = unistd::dup(stream.fd()).map_err(SystemError::Dup2Failed)?;
            // SAFETY: `dup` just returned this descriptor and nothing else owns it.
            let saved = unsafe { OwnedFd::from_raw_fd(saved) };
            unistd::dup2(file.as_raw_fd(), stream.fd()).map_err(SystemError::Dup2Failed)?;
            debug!("redirected fd {} to {}", stream.fd(), redirect.path.display());
            guard.saved.push((stream, saved));
        }
        Ok(guard)
    }

    pub fn is_active(&self) -> bool {
        !self.saved.is_empty()
    }
}

impl Drop for RedirectGuard {
    fn drop(&mut self) {
        if self.saved.is_empty() {
            return;
        }
        flush_std();
        for (stream, saved) in self.saved.drain(..).rev() {
            if let Err(e) = unistd::dup2(saved.as_raw_fd(), stream.fd()) {
                warn!("failed to restore fd {}: {}", stream.fd(), e);
            }
        }
    }
}
