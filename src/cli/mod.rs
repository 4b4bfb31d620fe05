//! CLI module for the xyo-cc driver and its harness
//!
//! ## Binaries
//!
//! - `xyo-cc` - the compiler command driver (`run`)
//! - `xyo-cc-harness` - the smoke test that drives `xyo-cc` (`run_harness`)
//!
//! ## Modules
//!
//! - `argfile` - `@file` expansion (response files and JSON manifests)
//! - `options` - ordered driver option parsing
//! - `commands` - build orchestration
//! - `harness` - clap definition of the harness command line
//!
//! ## Design
//!
//! The driver's option grammar is order-sensitive and silently skips unknown
//! options, so it is parsed by hand; the harness uses clap derive.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` / `run_harness()` functions handle errors and exit.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod argfile;
pub mod commands;
pub mod harness;
pub mod options;

use std::env;
use std::fmt;
use std::process;
use std::sync::Arc;

use clap::Parser;

use crate::driver::config::EnvConfig;
use crate::process::{ProcessRunner, SystemRunner};
use crate::version::DRIVER_VERSION;
use argfile::ArgFileError;
use options::Action;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Create an error with a custom exit code.
    pub fn with_code(message: impl Into<String>, code: i32) -> Self {
        Self::new(message, ExitCode(code))
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<ArgFileError> for CliError {
    fn from(err: ArgFileError) -> Self {
        if err.has_snippet() {
            return CliError::failure(format!("{:?}", miette::Report::new(err)));
        }
        CliError::failure(format!("Error: {}", err))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Static texts
// ============================================================================

const USAGE: &str = "\
options:
    --help                    this info
    --usage                   this info
    --license                 show license
    --version                 show version
    --project=name            project name
    --platform=name           platform name
    --debug                   build debug version
    --release                 build release version
    --exe                     build executable
    --lib                     build static library
    --dll                     build dynamic library
    --dll-x-static            build dynamic library, objects compiled as for a static one
    --crt-dynamic             link the dynamic C runtime (default for dll)
    --crt-static              link the static C runtime (default for lib)
    --threads=count           number of parallel compile jobs
    --def=value               add a preprocessor definition
    --inc=path                add an include search path
    --src-h=file              add a C header
    --src-c=file              add a C source
    --src-hpp=file            add a C++ header
    --src-cpp=file            add a C++ source
    --use-lib-path=path       add a library search path
    --use-lib=library         link against library
    --def-file=file           linker definitions file (dll)
    --rc-inc=path             add a resource compiler include path
    --rc-def=value            add a resource compiler definition
    --rc-src=file             add a resource script
    --source-path=path        folder holding the sources, default .
    --output-path=path        output folder for binaries and libraries, default .
    --temp-path=path          folder for objects and response files, default ./temp
    --output-bin-path=path    output folder for binaries, default .
    --output-lib-path=path    output folder for libraries, default .
    --lib-name=name           static library name, default <project>.static
    --lib-version=version     version suffix of the dynamic library
    --force-make              rebuild everything
    --no-lib                  keep dll import libraries in the temp folder
";

const LICENSE: &str = "\
C/C++ Compiler Command Driver

Licensed under the Apache License, Version 2.0
<http://www.apache.org/licenses/LICENSE-2.0>.

Distributed on an \"AS IS\" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND.
";

pub fn version_text() -> String {
    format!("version {}\n", DRIVER_VERSION)
}

pub fn usage_text() -> String {
    format!("C/C++ Compiler Command Driver\n{}\n{}\n", version_text(), USAGE)
}

pub fn license_text() -> &'static str {
    LICENSE
}

// ============================================================================
// CLI entry points
// ============================================================================

/// Main driver entry point.
///
/// This is the only place where `process::exit` is called for `xyo-cc`.
pub fn run() {
    let args: Vec<String> = env::args().skip(1).collect();
    let env = EnvConfig::from_env();
    finish(execute(args, &env, Arc::new(SystemRunner)));
}

/// Harness entry point; the only place `xyo-cc-harness` exits.
pub fn run_harness() {
    let cli = harness::HarnessCli::parse();
    finish(harness::execute_harness(&cli, &SystemRunner));
}

fn finish(result: CliResult<ExitCode>) {
    match result {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute one driver invocation and return its exit code.
pub fn execute(args: Vec<String>, env: &EnvConfig, runner: Arc<dyn ProcessRunner>) -> CliResult<ExitCode> {
    let tokens = argfile::expand_arguments(args)?;

    match options::parse_options(&tokens, env)? {
        Action::ShowUsage => {
            print!("{}", usage_text());
            Ok(ExitCode::SUCCESS)
        }
        Action::ShowLicense => {
            print!("{}", license_text());
            Ok(ExitCode::SUCCESS)
        }
        Action::ShowVersion => {
            print!("{}", version_text());
            Ok(ExitCode::SUCCESS)
        }
        Action::Build(request) => commands::build(&request, env, runner),
    }
}

// ============================================================================
// Tests
// ============================================================================
