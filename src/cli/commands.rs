//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::path::PathBuf;
use std::sync::Arc;

use crate::driver::config::{EnvConfig, Target};
use crate::driver::options::{Artifact, BuildOptions, Linkage};
use crate::driver::pipeline::{BuildContext, BuildError, TargetSpec, build_target};
use crate::driver::toolchain::{Language, select_toolchain};
use crate::process::ProcessRunner;

use super::options::BuildRequest;
use super::{CliError, CliResult, ExitCode};

// ============================================================================
// Source resolution
// ============================================================================

/// Every source list of a request, resolved against `--source-path`.
#[derive(Debug, Default)]
pub struct ResolvedSources {
    pub h: Vec<PathBuf>,
    pub c: Vec<PathBuf>,
    pub hpp: Vec<PathBuf>,
    pub cpp: Vec<PathBuf>,
    pub rc: Vec<PathBuf>,
}

impl ResolvedSources {
    pub fn resolve(req: &BuildRequest) -> CliResult<Self> {
        let base = &req.source_path;
        Ok(Self {
            h: resolve_files(base, &req.h_sources)?,
            c: resolve_files(base, &req.c_sources)?,
            hpp: resolve_files(base, &req.hpp_sources)?,
            cpp: resolve_files(base, &req.cpp_sources)?,
            rc: resolve_files(base, &req.rc_sources)?,
        })
    }

    fn is_empty(&self) -> bool {
        self.c.is_empty() && self.cpp.is_empty()
    }

    /// C sources with C headers, then C++ sources with C++ headers.
    fn passes(&self) -> [(Language, &[PathBuf], &[PathBuf]); 2] {
        [
            (Language::C, self.c.as_slice(), self.h.as_slice()),
            (Language::Cpp, self.cpp.as_slice(), self.hpp.as_slice()),
        ]
    }
}

fn resolve_files(base: &str, files: &[String]) -> CliResult<Vec<PathBuf>> {
    files
        .iter()
        .map(|file| {
            let path = PathBuf::from(format!("{}/{}", base, file));
            if path.is_file() {
                Ok(path)
            } else {
                Err(CliError::failure(format!("Error: file not found {}", file)))
            }
        })
        .collect()
}

/// `PROJECT_INTERNAL`, upper-cased, with `-` and `.` mapped to `_`.
/// A `lib` prefix on the project name is dropped.
pub fn internal_define(project: &str) -> String {
    let define = format!("{}_INTERNAL", project.to_ascii_uppercase()).replace(['-', '.'], "_");
    if project.starts_with("lib") {
        if let Some(rest) = define.strip_prefix("LIB") {
            return rest.to_string();
        }
    }
    define
}

// ============================================================================
// Build
// ============================================================================

/// Build every artifact the request names: static library, dynamic library,
/// then executable.
#[tracing::instrument(skip_all, fields(project = %req.project, platform = %req.platform))]
pub fn build(req: &BuildRequest, env: &EnvConfig, runner: Arc<dyn ProcessRunner>) -> CliResult<ExitCode> {
    let sources = ResolvedSources::resolve(req)?;

    let mut defines = req.defines.clone();
    defines.push(internal_define(&req.project));

    let target = Target::for_platform(&req.platform);
    let ctx = BuildContext {
        toolchain: select_toolchain(target, env),
        runner,
        threads: req.threads,
        echo: true,
        force: req.force,
    };
    tracing::debug!(toolchain = ?target.toolchain, threads = req.threads, "build context ready");

    let base = TargetSpec {
        name: req.project.clone(),
        artifact: Artifact::Executable,
        options: BuildOptions::default(),
        language: Language::Cpp,
        sources: Vec::new(),
        headers: Vec::new(),
        defines,
        include_paths: req.include_paths.clone(),
        rc_sources: sources.rc.clone(),
        rc_defines: req.rc_defines.clone(),
        rc_include_paths: req.rc_include_paths.clone(),
        def_file: req.def_file.clone(),
        library_paths: req.library_paths.clone(),
        libraries: req.libraries.clone(),
        version: req.lib_version.clone(),
        bin_path: PathBuf::from(&req.output_bin_path),
        lib_path: PathBuf::from(&req.output_lib_path),
        temp_path: PathBuf::from(&req.temp_path),
    };

    if req.make_library {
        let spec = TargetSpec {
            name: req
                .lib_name
                .clone()
                .unwrap_or_else(|| format!("{}.static", req.project)),
            artifact: Artifact::StaticLibrary,
            options: BuildOptions::new(req.profile, req.crt, Linkage::Static),
            ..base.clone()
        };
        build_artifact(&ctx, &spec, &sources, &req.project)?;
    }

    if req.make_dynamic_library {
        let linkage = if req.x_static { Linkage::DynamicXStatic } else { Linkage::Dynamic };
        let lib_path = if req.no_lib {
            PathBuf::from(&req.temp_path)
        } else {
            base.lib_path.clone()
        };
        let spec = TargetSpec {
            artifact: Artifact::DynamicLibrary,
            options: BuildOptions::new(req.profile, req.crt, linkage),
            lib_path,
            ..base.clone()
        };
        build_artifact(&ctx, &spec, &sources, &req.project)?;
    }

    if req.make_executable {
        let spec = TargetSpec {
            artifact: Artifact::Executable,
            options: BuildOptions::for_executable(req.profile, req.crt),
            ..base
        };
        build_artifact(&ctx, &spec, &sources, &req.project)?;
    }

    Ok(ExitCode::SUCCESS)
}

fn build_artifact(ctx: &BuildContext, spec: &TargetSpec, sources: &ResolvedSources, project: &str) -> CliResult<()> {
    if sources.is_empty() {
        return Err(CliError::failure(format!(
            "Error: no c/cpp source for {} {}",
            spec.artifact, project
        )));
    }

    for (language, files, headers) in sources.passes() {
        if files.is_empty() {
            continue;
        }
        let pass = TargetSpec {
            language,
            sources: files.to_vec(),
            headers: headers.to_vec(),
            ..spec.clone()
        };
        build_target(ctx, &pass).map_err(|err| building_error(spec.artifact, project, &err))?;
    }
    Ok(())
}

fn building_error(artifact: Artifact, project: &str, err: &BuildError) -> CliError {
    tracing::error!(error = %err, "build failed");
    CliError::failure(format!("Error: building {} {}", artifact, project))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_define() {
        assert_eq!(internal_define("xyo-cc"), "XYO_CC_INTERNAL");
        assert_eq!(internal_define("libxyo.system"), "XYO_SYSTEM_INTERNAL");
        assert_eq!(internal_define("Library"), "LIBRARY_INTERNAL");
        assert_eq!(internal_define("lib"), "_INTERNAL");
    }

    #[test]
    fn test_missing_source_is_reported_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut req = BuildRequest::new(&EnvConfig::default());
        req.source_path = dir.path().to_string_lossy().into_owned();
        req.cpp_sources = vec!["missing.cpp".to_string()];
        let err = ResolvedSources::resolve(&req).unwrap_err();
        assert_eq!(err.message, "Error: file not found missing.cpp");
    }

    #[test]
    fn test_sources_resolve_under_source_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.c"), "").unwrap();
        let mut req = BuildRequest::new(&EnvConfig::default());
        req.source_path = dir.path().to_string_lossy().into_owned();
        req.c_sources = vec!["a.c".to_string()];
        let sources = ResolvedSources::resolve(&req).unwrap();
        assert_eq!(sources.c, vec![PathBuf::from(format!("{}/a.c", req.source_path))]);
        assert!(!sources.is_empty());
    }
}
