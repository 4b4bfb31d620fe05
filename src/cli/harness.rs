//! `xyo-cc-harness` command line

use std::path::PathBuf;

use clap::Parser;

use super::{CliError, CliResult, ExitCode};
use crate::harness::{
    DEFAULT_BANNER, DEFAULT_DRIVER, DEFAULT_OUTPUT_BIN_PATH, DEFAULT_TEMP_PATH, HarnessPlan, run_plan,
};
use crate::process::ProcessRunner;
use crate::version::DRIVER_VERSION;

/// Smoke test for the xyo-cc driver binary
#[derive(Parser, Debug)]
#[command(name = "xyo-cc-harness")]
#[command(version = DRIVER_VERSION)]
#[command(about = "Run the xyo-cc driver against its smoke-test argument files", long_about = None)]
pub struct HarnessCli {
    /// Directory to run in (default: current directory)
    #[arg(short = 'C', long = "root", value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Driver binary to invoke
    #[arg(long, value_name = "PATH", default_value = DEFAULT_DRIVER)]
    pub driver: String,

    /// Passed to the driver as --output-bin-path
    #[arg(long, value_name = "DIR", default_value = DEFAULT_OUTPUT_BIN_PATH)]
    pub output_bin_path: String,

    /// Scratch directory created before the first run
    #[arg(long, value_name = "DIR", default_value = DEFAULT_TEMP_PATH)]
    pub temp_path: String,

    /// Banner printed before anything runs
    #[arg(long, value_name = "TEXT", default_value = DEFAULT_BANNER)]
    pub message: String,

    /// Argument files, each passed as @FILE (default: the two standard inputs)
    #[arg(value_name = "ARGUMENT_FILE")]
    pub argument_files: Vec<String>,
}

impl HarnessCli {
    pub fn plan(&self) -> HarnessPlan {
        let plan = if self.argument_files.is_empty() {
            HarnessPlan::smoke(
                &self.driver,
                &self.output_bin_path,
                &self.temp_path,
                &crate::harness::DEFAULT_ARGUMENT_FILES,
            )
        } else {
            HarnessPlan::smoke(&self.driver, &self.output_bin_path, &self.temp_path, &self.argument_files)
        };
        let plan = plan.with_banner(&self.message);
        match &self.root {
            Some(root) => plan.with_root(root),
            None => plan,
        }
    }
}

/// Run the harness described by `cli`; a failing step's exit code becomes ours.
pub fn execute_harness(cli: &HarnessCli, runner: &dyn ProcessRunner) -> CliResult<ExitCode> {
    run_plan(&cli.plan(), runner).map_err(|err| CliError::with_code(format!("Error: {}", err), err.exit_code()))?;
    Ok(ExitCode::SUCCESS)
}
