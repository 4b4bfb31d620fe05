//! Subprocess invocation boundary
//!
//! Every external tool the driver or the harness starts (compiler, archiver,
//! linker, resource compiler, the driver binary itself) is described by an
//! [`Invocation`] and executed through a [`ProcessRunner`]. Planning code never
//! touches `std::process` directly, so tests can substitute a recording runner.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

/// Errors raised while starting a subprocess.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write response file {}: {source}", path.display())]
    ResponseFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Options written to disk and handed to the tool as `@path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFile {
    pub path: PathBuf,
    pub contents: String,
}

/// A single external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Written before the program starts; its `@path` argument is already in `args`.
    pub response_file: Option<ResponseFile>,
    pub current_dir: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            response_file: None,
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Attach a response file and pass it to the program as `@path`.
    pub fn with_response_file(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        let path = path.into();
        self.args.push(format!("@{}", path.display()));
        self.response_file = Some(ResponseFile {
            path,
            contents: contents.into(),
        });
        self
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Render the command the way a user would type it.
    pub fn command_line(&self) -> String {
        let mut line = quote_arg(&self.program);
        for arg in &self.args {
            line.push(' ');
            line.push_str(&quote_arg(arg));
        }
        line
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command_line())
    }
}

fn quote_arg(arg: &str) -> String {
    if arg.is_empty() || arg.chars().any(char::is_whitespace) {
        format!("\"{}\"", arg.replace('"', "\\\""))
    } else {
        arg.to_string()
    }
}

/// How a finished subprocess ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    Code(i32),
    /// Killed by a signal; no exit code is available.
    Terminated,
}

impl ProcessExit {
    pub fn success(self) -> bool {
        self == ProcessExit::Code(0)
    }
}

impl From<std::process::ExitStatus> for ProcessExit {
    fn from(status: std::process::ExitStatus) -> Self {
        match status.code() {
            Some(code) => ProcessExit::Code(code),
            None => ProcessExit::Terminated,
        }
    }
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessExit::Code(code) => write!(f, "exit code {}", code),
            ProcessExit::Terminated => write!(f, "terminated by signal"),
        }
    }
}

/// Run an invocation to completion.
///
/// Implementations must be shareable across the compile worker pool.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> Result<ProcessExit, ProcessError>;
}

/// Spawns real processes with inherited stdio (current behavior).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessExit, ProcessError> {
        if let Some(rsp) = &invocation.response_file {
            write_response_file(rsp)?;
        }

        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        if let Some(dir) = &invocation.current_dir {
            command.current_dir(dir);
        }

        tracing::debug!(command = %invocation, "spawning");
        let status = command.status().map_err(|source| ProcessError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;
        Ok(status.into())
    }
}

fn write_response_file(rsp: &ResponseFile) -> Result<(), ProcessError> {
    let to_err = |source| ProcessError::ResponseFile {
        path: rsp.path.clone(),
        source,
    };
    ensure_parent_dir(&rsp.path).map_err(to_err)?;
    fs::write(&rsp.path, &rsp.contents).map_err(to_err)
}

/// Create a directory and its parents. Existing directories are not an error.
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    if path.as_os_str().is_empty() {
        return Ok(());
    }
    fs::create_dir_all(path)
}

/// Create the directory that will hold `file`.
pub fn ensure_parent_dir(file: &Path) -> io::Result<()> {
    match file.parent() {
        Some(parent) => ensure_dir(parent),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_quotes_whitespace() {
        let inv = Invocation::new("ar").args(["qcs", "out dir/lib.a", "a.o"]);
        assert_eq!(inv.command_line(), "ar qcs \"out dir/lib.a\" a.o");
    }

    #[test]
    fn test_response_file_adds_at_argument() {
        let inv = Invocation::new("gcc").with_response_file("temp/x.cpp2o", "-c");
        assert_eq!(inv.args, vec!["@temp/x.cpp2o".to_string()]);
        assert_eq!(inv.response_file.as_ref().map(|r| r.contents.as_str()), Some("-c"));
    }

    #[test]
    fn test_exit_success_only_for_zero() {
        assert!(ProcessExit::Code(0).success());
        assert!(!ProcessExit::Code(2).success());
        assert!(!ProcessExit::Terminated.success());
    }

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("output").join("test");
        ensure_dir(&nested).unwrap();
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_writes_response_file_and_reports_code() {
        let dir = tempfile::tempdir().unwrap();
        let rsp = dir.path().join("nested").join("args.rsp");
        let inv = Invocation::new("sh")
            .args(["-c", "exit 7"])
            .in_dir(dir.path());
        let inv = Invocation {
            response_file: Some(ResponseFile {
                path: rsp.clone(),
                contents: "-O1".to_string(),
            }),
            ..inv
        };
        let exit = SystemRunner.run(&inv).unwrap();
        assert_eq!(exit, ProcessExit::Code(7));
        assert_eq!(fs::read_to_string(rsp).unwrap(), "-O1");
    }

    #[test]
    fn test_system_runner_spawn_error() {
        let inv = Invocation::new("definitely-not-a-real-program-ccdriver");
        let err = SystemRunner.run(&inv).unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }
}
