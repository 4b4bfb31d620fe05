//! Driver option parsing
//!
//! Options are applied strictly left to right. Several of them change state
//! that later options can override (`--lib` sets the static runtime, a later
//! `--crt-dynamic` switches it back), so a declarative parser does not fit;
//! this is a plain fold over the expanded token list.

use std::thread;

use super::{CliError, CliResult};
use crate::driver::config::{EnvConfig, default_platform_name};
use crate::driver::options::{Crt, Profile};
use crate::driver::queue::MAX_THREADS;

/// What the command line asks the driver to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ShowUsage,
    ShowLicense,
    ShowVersion,
    Build(BuildRequest),
}

/// Parsed option state, defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub project: String,
    pub platform: String,
    pub profile: Profile,
    pub crt: Crt,
    /// `--dll-x-static`: the dynamic library is compiled as for a static one.
    pub x_static: bool,
    pub make_executable: bool,
    pub make_library: bool,
    pub make_dynamic_library: bool,
    pub threads: usize,
    pub defines: Vec<String>,
    pub include_paths: Vec<String>,
    pub h_sources: Vec<String>,
    pub c_sources: Vec<String>,
    pub hpp_sources: Vec<String>,
    pub cpp_sources: Vec<String>,
    pub library_paths: Vec<String>,
    pub libraries: Vec<String>,
    pub def_file: Option<String>,
    pub rc_include_paths: Vec<String>,
    pub rc_defines: Vec<String>,
    pub rc_sources: Vec<String>,
    pub source_path: String,
    pub temp_path: String,
    pub output_bin_path: String,
    pub output_lib_path: String,
    pub lib_name: Option<String>,
    pub lib_version: Option<String>,
    pub force: bool,
    pub no_lib: bool,
}

impl BuildRequest {
    pub fn new(env: &EnvConfig) -> Self {
        Self {
            project: "project".to_string(),
            platform: default_platform_name(),
            profile: if env.debug { Profile::Debug } else { Profile::Release },
            crt: Crt::Dynamic,
            x_static: false,
            make_executable: false,
            make_library: false,
            make_dynamic_library: false,
            threads: host_threads(),
            defines: env.defines.clone(),
            include_paths: Vec::new(),
            h_sources: Vec::new(),
            c_sources: Vec::new(),
            hpp_sources: Vec::new(),
            cpp_sources: Vec::new(),
            library_paths: Vec::new(),
            libraries: Vec::new(),
            def_file: None,
            rc_include_paths: Vec::new(),
            rc_defines: Vec::new(),
            rc_sources: Vec::new(),
            source_path: ".".to_string(),
            temp_path: "./temp".to_string(),
            output_bin_path: ".".to_string(),
            output_lib_path: ".".to_string(),
            lib_name: None,
            lib_version: None,
            force: false,
            no_lib: false,
        }
    }

    pub fn has_target(&self) -> bool {
        self.make_executable || self.make_library || self.make_dynamic_library
    }
}

/// Parse expanded arguments into an [`Action`].
pub fn parse_options(tokens: &[String], env: &EnvConfig) -> CliResult<Action> {
    let mut req = BuildRequest::new(env);

    for token in tokens {
        let Some(option) = token.strip_prefix("--") else {
            continue;
        };
        let (name, value) = option.split_once('=').unwrap_or((option, ""));

        match name {
            "help" | "usage" => return Ok(Action::ShowUsage),
            "license" => return Ok(Action::ShowLicense),
            "version" => return Ok(Action::ShowVersion),

            "project" => req.project = required(value, "project is empty")?,
            "platform" => req.platform = required(value, "platform is empty")?,
            "debug" => req.profile = Profile::Debug,
            "release" => req.profile = Profile::Release,
            "exe" => req.make_executable = true,
            "lib" => {
                req.make_library = true;
                req.crt = Crt::Static;
            }
            "dll" => {
                req.make_dynamic_library = true;
                req.crt = Crt::Dynamic;
            }
            "dll-x-static" => {
                req.make_dynamic_library = true;
                req.crt = Crt::Static;
                req.x_static = true;
            }
            "crt-dynamic" => req.crt = Crt::Dynamic,
            "crt-static" => req.crt = Crt::Static,
            "threads" => req.threads = parse_threads(value),

            "def" => req.defines.push(required(value, "def parameter is empty")?),
            "inc" => req.include_paths.push(required(value, "inc path is empty")?),
            "src-h" => req.h_sources.push(required(value, "src-h file not provided")?),
            "src-c" => req.c_sources.push(required(value, "src-c file not provided")?),
            "src-hpp" => req.hpp_sources.push(required(value, "src-hpp file not provided")?),
            "src-cpp" => req.cpp_sources.push(required(value, "src-cpp file not provided")?),
            "use-lib-path" => req.library_paths.push(required(value, "use-lib-path is empty")?),
            "use-lib" => {
                let library = required(value, "use-lib is empty")?;
                if library.ends_with(".static") {
                    req.crt = Crt::Static;
                }
                req.libraries.push(library);
            }
            "def-file" => req.def_file = Some(required(value, "def-file is empty")?),
            "rc-inc" => req.rc_include_paths.push(required(value, "rc-inc path is empty")?),
            "rc-def" => req.rc_defines.push(required(value, "rc-def parameter is empty")?),
            "rc-src" => req.rc_sources.push(required(value, "rc-src file not provided")?),

            "source-path" => req.source_path = required(value, "source-path not provided")?,
            "output-path" => {
                let path = required(value, "output-path not provided")?;
                req.output_bin_path = path.clone();
                req.output_lib_path = path;
            }
            "temp-path" => req.temp_path = required(value, "temp-path is empty")?,
            "output-bin-path" => req.output_bin_path = required(value, "output-bin-path is empty")?,
            "output-lib-path" => req.output_lib_path = required(value, "output-lib-path is empty")?,
            "lib-name" => req.lib_name = Some(required(value, "lib-name is empty")?),
            "lib-version" => req.lib_version = Some(required(value, "lib-version is empty")?),
            "force-make" => req.force = true,
            "no-lib" => req.no_lib = true,

            other => tracing::debug!(option = other, "ignoring unknown option"),
        }
    }

    if tokens.is_empty() {
        return Ok(Action::ShowUsage);
    }
    if !req.has_target() {
        return Err(CliError::failure("Error: no exe/dll/lib specified to compile"));
    }
    Ok(Action::Build(req))
}

fn required(value: &str, message: &str) -> CliResult<String> {
    if value.is_empty() {
        return Err(CliError::failure(format!("Error: {}", message)));
    }
    Ok(value.to_string())
}

/// Leading integer of `value` (sign allowed), else the host CPU count.
/// Clamped to `1..=MAX_THREADS`.
pub fn parse_threads(value: &str) -> usize {
    let text = value.trim_start();
    let digits_from = usize::from(text.starts_with(['+', '-']));
    let end = text[digits_from..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(text.len(), |i| i + digits_from);
    match text[..end].parse::<i64>() {
        Ok(n) => usize::try_from(n).unwrap_or(0).clamp(1, MAX_THREADS),
        Err(_) => host_threads(),
    }
}

fn host_threads() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
