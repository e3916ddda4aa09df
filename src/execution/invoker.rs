//! Command Invocation
//!
//! Runs a unit's command line in the platform shell with environment
//! overrides applied and captures its exit status and output.

use std::collections::BTreeMap;
use std::env;
use std::io;
use std::path::PathBuf;
use std::process::Command;

use log::debug;

#[cfg(windows)]
const SHELL: (&str, &str) = ("cmd", "/c");

#[cfg(not(windows))]
const SHELL: (&str, &str) = ("bash", "-c");

/// Captured outcome of one command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Invocation {
    /// Process exit code, `None` if terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl Invocation {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs command strings on behalf of units.
///
/// Implementations must be shareable across worker threads; one invoker is
/// typically shared by every unit of a batch.
pub trait CommandInvoker: Send + Sync {
    fn invoke(&self, command: &str, env: &BTreeMap<String, String>) -> io::Result<Invocation>;
}

/// Production invoker spawning `bash -c` (or `cmd /c` on Windows).
#[derive(Debug, Clone, Default)]
pub struct ShellInvoker {
    working_dir: Option<PathBuf>,
}

impl ShellInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the directory commands are started in.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl CommandInvoker for ShellInvoker {
    fn invoke(&self, command: &str, env: &BTreeMap<String, String>) -> io::Result<Invocation> {
        let (shell, param) = SHELL;
        let mut cmd = Command::new(shell);
        cmd.arg(param).arg(command);

        for (key, value) in env {
            if let Ok(existing) = env::var(key) {
                debug!(
                    "Env. variable [{}] already set to [{}], overriding with [{}]",
                    key, existing, value
                );
            }
            cmd.env(key, value);
        }

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
            debug!("Executing in directory: {}", dir.display());
        }

        let output = cmd.output()?;

        Ok(Invocation {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        })
    }
}
