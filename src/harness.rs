//! Smoke-test harness for the driver binary
//!
//! A harness run is a flat, strictly sequential script: announce itself,
//! create the output directories, then run the driver once per argument file.
//! The first subprocess that does not exit with 0 ends the run, and its exit
//! code becomes the harness exit code.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::process::{Invocation, ProcessError, ProcessExit, ProcessRunner, ensure_dir};

pub const DEFAULT_BANNER: &str = "test";
pub const DEFAULT_DRIVER: &str = "output/bin/xyo-cc";
pub const DEFAULT_OUTPUT_BIN_PATH: &str = "output/test";
pub const DEFAULT_TEMP_PATH: &str = "temp";
pub const DEFAULT_ARGUMENT_FILES: [&str; 2] = ["input/xyo-cc-x.compile.arguments", "input/xyo-cc-y.compile.json"];

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("cannot create directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Spawn(#[from] ProcessError),

    #[error("`{command}` failed with exit code {code}")]
    Failed { command: String, code: i32 },

    #[error("`{command}` was terminated by a signal")]
    Terminated { command: String },
}

impl HarnessError {
    /// Exit code the harness process should end with.
    pub fn exit_code(&self) -> i32 {
        match self {
            HarnessError::Failed { code, .. } => *code,
            _ => 1,
        }
    }
}

/// What a harness run does, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessPlan {
    pub banner: String,
    pub directories: Vec<PathBuf>,
    pub steps: Vec<Invocation>,
    /// Directory every relative path is resolved against; `None` means the
    /// current directory.
    pub root: Option<PathBuf>,
}

impl HarnessPlan {
    /// The fixed smoke test: two driver runs writing into `output/test`.
    pub fn standard() -> Self {
        Self::smoke(
            DEFAULT_DRIVER,
            DEFAULT_OUTPUT_BIN_PATH,
            DEFAULT_TEMP_PATH,
            &DEFAULT_ARGUMENT_FILES,
        )
    }

    /// Run `driver @FILE --output-bin-path=OUT` for each argument file.
    pub fn smoke<S: AsRef<str>>(driver: &str, output_bin_path: &str, temp_path: &str, argument_files: &[S]) -> Self {
        let steps = argument_files
            .iter()
            .map(|file| {
                Invocation::new(driver)
                    .arg(format!("@{}", file.as_ref()))
                    .arg(format!("--output-bin-path={}", output_bin_path))
            })
            .collect();
        Self {
            banner: DEFAULT_BANNER.to_string(),
            directories: vec![PathBuf::from(output_bin_path), PathBuf::from(temp_path)],
            steps,
            root: None,
        }
    }

    pub fn with_banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = banner.into();
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Step as it will be spawned: working directory set to the root, and a
    /// relative program path with a separator anchored there too.
    fn rooted(&self, step: &Invocation) -> Invocation {
        let Some(root) = &self.root else {
            return step.clone();
        };
        let mut step = step.clone();
        let program = Path::new(&step.program);
        if program.is_relative() && program.components().count() > 1 {
            step.program = root.join(program).to_string_lossy().into_owned();
        }
        step.in_dir(root)
    }
}

impl Default for HarnessPlan {
    fn default() -> Self {
        Self::standard()
    }
}

/// Execute a plan, stopping at the first failing step.
#[tracing::instrument(skip_all, fields(steps = plan.steps.len()))]
pub fn run_plan(plan: &HarnessPlan, runner: &dyn ProcessRunner) -> Result<(), HarnessError> {
    println!("{}", plan.banner);

    for dir in &plan.directories {
        let path = plan.resolve(dir);
        ensure_dir(&path).map_err(|source| HarnessError::Directory { path, source })?;
    }

    for step in &plan.steps {
        let step = plan.rooted(step);
        tracing::debug!(command = %step, "harness step");
        match runner.run(&step)? {
            ProcessExit::Code(0) => {}
            ProcessExit::Code(code) => {
                return Err(HarnessError::Failed {
                    command: step.command_line(),
                    code,
                });
            }
            ProcessExit::Terminated => {
                return Err(HarnessError::Terminated {
                    command: step.command_line(),
                });
            }
        }
    }
    Ok(())
}
