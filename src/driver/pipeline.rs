//! Build pipeline: sources -> objects -> artifact
//!
//! [`build_target`] is the single entry point used by the CLI for each
//! requested artifact. It decides which sources are stale, compiles them on
//! the [`CompileQueue`], converts resource scripts where the toolchain embeds
//! them, then links unless nothing was rebuilt and the artifact is already
//! newer than every object.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use super::incremental::{HeaderStamp, is_stale, source_state, touch_if_exists};
use super::options::{Artifact, BuildOptions};
use super::queue::{CompileQueue, QueueError, QueuedJob};
use super::toolchain::{CompileJob, Language, LinkRequest, ResourceJob, Toolchain};
use crate::process::{Invocation, ProcessError, ProcessExit, ProcessRunner, ensure_dir, ensure_parent_dir};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("nothing to link for {name}")]
    NoObjects { name: String },

    #[error("compile failed ({exit}): {command}")]
    Compile { command: String, exit: ProcessExit },

    #[error("command failed ({exit}): {command}")]
    Command { command: String, exit: ProcessExit },

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Queue(#[from] QueueError),
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> BuildError + '_ {
    move |source| BuildError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Shared state for every artifact built by one driver run.
pub struct BuildContext {
    pub toolchain: Box<dyn Toolchain>,
    pub runner: Arc<dyn ProcessRunner>,
    pub threads: usize,
    /// Print each command before running it.
    pub echo: bool,
    /// Rebuild even when outputs look up to date.
    pub force: bool,
}

/// One artifact built from sources of one language.
#[derive(Debug, Clone)]
pub struct TargetSpec {
    pub name: String,
    pub artifact: Artifact,
    pub options: BuildOptions,
    pub language: Language,
    pub sources: Vec<PathBuf>,
    pub headers: Vec<PathBuf>,
    pub defines: Vec<String>,
    pub include_paths: Vec<String>,
    pub rc_sources: Vec<PathBuf>,
    pub rc_defines: Vec<String>,
    pub rc_include_paths: Vec<String>,
    pub def_file: Option<String>,
    pub library_paths: Vec<String>,
    pub libraries: Vec<String>,
    pub version: Option<String>,
    pub bin_path: PathBuf,
    pub lib_path: PathBuf,
    pub temp_path: PathBuf,
}

/// Build one artifact and return its path.
#[tracing::instrument(skip_all, fields(name = %spec.name, artifact = %spec.artifact, tag = %spec.options.tag()))]
pub fn build_target(ctx: &BuildContext, spec: &TargetSpec) -> Result<PathBuf, BuildError> {
    prepare_dirs(spec)?;
    let stem = ctx.toolchain.artifact_stem(&spec.name, spec.artifact);

    let mut objects = compile_sources(ctx, spec, &stem)?;
    if ctx.toolchain.embeds_resources(spec.artifact) {
        let resources = compile_resources(ctx, spec, &stem)?;
        objects.paths.extend(resources.paths);
        objects.rebuilt |= resources.rebuilt;
    }
    if objects.paths.is_empty() {
        return Err(BuildError::NoObjects { name: spec.name.clone() });
    }

    link(ctx, spec, &objects)
}

/// Object files of one artifact, and whether this run rewrote any of them.
///
/// File times can be too coarse to order an object written just after the
/// artifact, so a rebuilt object always forces the link.
#[derive(Debug, Default)]
struct Objects {
    paths: Vec<PathBuf>,
    rebuilt: bool,
}

fn prepare_dirs(spec: &TargetSpec) -> Result<(), BuildError> {
    let mut dirs = vec![spec.temp_path.as_path()];
    if spec.artifact != Artifact::StaticLibrary {
        dirs.push(&spec.bin_path);
    }
    if spec.artifact != Artifact::Executable {
        dirs.push(&spec.lib_path);
    }
    for dir in dirs {
        ensure_dir(dir).map_err(io_err(dir))?;
    }
    Ok(())
}

fn compile_sources(ctx: &BuildContext, spec: &TargetSpec, stem: &str) -> Result<Objects, BuildError> {
    let headers = HeaderStamp::scan(&spec.headers);
    let total = spec.sources.len();
    let mut objects = Vec::with_capacity(total);
    let mut jobs = Vec::new();

    for (k, source) in spec.sources.iter().enumerate() {
        let object = ctx
            .toolchain
            .object_path(stem, source, &spec.temp_path, spec.options, k + 1, total);
        let state = source_state(source, &object, &headers).map_err(io_err(source))?;
        tracing::debug!(source = %source.display(), ?state, "source state");

        if ctx.force || state.needs_compile() {
            ensure_parent_dir(&object).map_err(io_err(&object))?;
            jobs.push(QueuedJob {
                index: k + 1,
                total,
                invocation: ctx.toolchain.compile(&CompileJob {
                    language: spec.language,
                    options: spec.options,
                    source: source.clone(),
                    object: object.clone(),
                    defines: spec.defines.clone(),
                    include_paths: spec.include_paths.clone(),
                }),
            });
        }
        objects.push(object);
    }

    let rebuilt = !jobs.is_empty();
    let reports = CompileQueue::new(ctx.threads)
        .with_echo(ctx.echo)
        .run(jobs, Arc::clone(&ctx.runner))?;
    if let Some(report) = reports.into_iter().find(|r| !r.succeeded()) {
        let exit = report.result?;
        return Err(BuildError::Compile {
            command: report.invocation.command_line(),
            exit,
        });
    }
    Ok(Objects { paths: objects, rebuilt })
}

fn compile_resources(ctx: &BuildContext, spec: &TargetSpec, stem: &str) -> Result<Objects, BuildError> {
    let headers = HeaderStamp::scan(&spec.headers);
    let total = spec.rc_sources.len();
    let mut objects = Objects::default();

    for (k, rc_file) in spec.rc_sources.iter().enumerate() {
        if headers.is_newer_than(rc_file) {
            touch_if_exists(rc_file).map_err(io_err(rc_file))?;
        }
        let object = ctx
            .toolchain
            .object_path(stem, rc_file, &spec.temp_path, spec.options, k + 1, total);
        let job = ResourceJob {
            rc_file: rc_file.clone(),
            object: object.clone(),
            defines: spec.rc_defines.clone(),
            include_paths: spec.rc_include_paths.clone(),
        };
        let Some(plan) = ctx.toolchain.resource(&job) else {
            continue;
        };
        ensure_parent_dir(&object).map_err(io_err(&object))?;

        let mut converted = false;
        if ctx.force || is_stale(&plan.res_file, std::slice::from_ref(rc_file)) {
            run_step(ctx, &plan.to_res, None)?;
            converted = true;
        }
        if converted || is_stale(&object, std::slice::from_ref(&plan.res_file)) {
            run_step(ctx, &plan.to_object, None)?;
            objects.rebuilt = true;
        }
        objects.paths.push(object);
    }
    Ok(objects)
}

fn link(ctx: &BuildContext, spec: &TargetSpec, objects: &Objects) -> Result<PathBuf, BuildError> {
    let plan = ctx.toolchain.link(&LinkRequest {
        name: &spec.name,
        bin_path: &spec.bin_path,
        lib_path: &spec.lib_path,
        temp_path: &spec.temp_path,
        artifact: spec.artifact,
        options: spec.options,
        objects: &objects.paths,
        def_file: spec.def_file.as_deref(),
        library_paths: &spec.library_paths,
        libraries: &spec.libraries,
        version: spec.version.as_deref(),
    });

    if !ctx.force && !objects.rebuilt && !is_stale(&plan.output, &objects.paths) {
        tracing::info!(output = %plan.output.display(), "up to date, link skipped");
        return Ok(plan.output);
    }

    if plan.rebuild_from_scratch {
        remove_if_exists(&plan.output)?;
    }
    let total = plan.steps.len();
    for (k, step) in plan.steps.iter().enumerate() {
        let position = (total > 1).then_some((k + 1, total));
        if let Err(err) = run_step(ctx, step, position) {
            if plan.rebuild_from_scratch {
                remove_if_exists(&plan.output)?;
            }
            return Err(err);
        }
    }

    if let Some(copy) = &plan.copy_to {
        fs::copy(&plan.output, copy).map_err(io_err(copy))?;
    }
    Ok(plan.output)
}

fn run_step(ctx: &BuildContext, invocation: &Invocation, position: Option<(usize, usize)>) -> Result<(), BuildError> {
    if ctx.echo {
        match position {
            Some((index, total)) => println!("[{}/{}] {}", index, total, invocation),
            None => println!("{}", invocation),
        }
    }
    let exit = ctx.runner.run(invocation)?;
    if !exit.success() {
        return Err(BuildError::Command {
            command: invocation.command_line(),
            exit,
        });
    }
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<(), BuildError> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(io_err(path)(err)),
        _ => Ok(()),
    }
}
