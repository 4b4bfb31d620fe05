//! Toolchain abstraction
//!
//! A [`Toolchain`] turns build steps (compile one source, link a set of
//! objects, convert a resource script) into [`Invocation`]s. It plans only:
//! it never touches the filesystem or spawns anything, so generated commands
//! can be inspected in tests. Execution, staleness checks and parallelism live
//! in `pipeline`.

use std::path::{Path, PathBuf};

use super::config::{EnvConfig, Target, ToolchainKind};
use super::gcc::Gcc;
use super::msvc::Msvc;
use super::options::{Artifact, BuildOptions};
use crate::process::Invocation;

/// Source language of a translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    C,
    Cpp,
}

/// One source file to compile into one object.
#[derive(Debug, Clone)]
pub struct CompileJob {
    pub language: Language,
    pub options: BuildOptions,
    pub source: PathBuf,
    pub object: PathBuf,
    pub defines: Vec<String>,
    pub include_paths: Vec<String>,
}

/// Inputs of a link (or archive) step.
#[derive(Debug, Clone, Copy)]
pub struct LinkRequest<'a> {
    pub name: &'a str,
    pub bin_path: &'a Path,
    pub lib_path: &'a Path,
    pub temp_path: &'a Path,
    pub artifact: Artifact,
    pub options: BuildOptions,
    pub objects: &'a [PathBuf],
    pub def_file: Option<&'a str>,
    pub library_paths: &'a [String],
    pub libraries: &'a [String],
    pub version: Option<&'a str>,
}

/// Commands producing one artifact.
#[derive(Debug, Clone)]
pub struct LinkPlan {
    pub output: PathBuf,
    pub steps: Vec<Invocation>,
    /// Remove `output` before the first step, and again if a step fails.
    pub rebuild_from_scratch: bool,
    /// Copy `output` here after a successful link.
    pub copy_to: Option<PathBuf>,
}

/// A resource script to turn into a linkable object.
#[derive(Debug, Clone)]
pub struct ResourceJob {
    pub rc_file: PathBuf,
    pub object: PathBuf,
    pub defines: Vec<String>,
    pub include_paths: Vec<String>,
}

/// Two-stage resource conversion: rc -> res -> object.
#[derive(Debug, Clone)]
pub struct ResourcePlan {
    pub res_file: PathBuf,
    pub to_res: Invocation,
    pub to_object: Invocation,
}

/// Command generator for one compiler family.
pub trait Toolchain: Send + Sync {
    fn kind(&self) -> ToolchainKind;

    fn target(&self) -> Target;

    /// Object file extension including the dot.
    fn object_extension(&self) -> &'static str;

    /// Name used as the object-file prefix for an artifact, e.g. `name.so`.
    fn artifact_stem(&self, name: &str, artifact: Artifact) -> String;

    /// Object file for the `index`-th (1-based) of `total` sources.
    fn object_path(
        &self,
        stem: &str,
        source: &Path,
        temp_path: &Path,
        options: BuildOptions,
        index: usize,
        total: usize,
    ) -> PathBuf {
        temp_path.join(format!(
            "{}.{}.{}.{}{}",
            file_name(Path::new(stem)),
            zero_padded(index, total),
            options.tag(),
            file_name(source),
            self.object_extension()
        ))
    }

    fn compile(&self, job: &CompileJob) -> Invocation;

    fn link(&self, request: &LinkRequest<'_>) -> LinkPlan;

    /// `None` when this toolchain cannot build resources for its target.
    fn resource(&self, job: &ResourceJob) -> Option<ResourcePlan>;

    /// Whether resource scripts are linked into this kind of artifact.
    fn embeds_resources(&self, artifact: Artifact) -> bool;
}

/// Pick the command generator for a target.
pub fn select_toolchain(target: Target, env: &EnvConfig) -> Box<dyn Toolchain> {
    match target.toolchain {
        ToolchainKind::Gcc => Box::new(Gcc::new(target, env.clone())),
        ToolchainKind::Msvc => Box::new(Msvc::new(target, env.clone())),
    }
}

/// Last path component as text (the whole path if there is none).
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// `index` left-padded with zeros to the digit count of `total`.
pub fn zero_padded(index: usize, total: usize) -> String {
    let width = total.max(1).to_string().len();
    format!("{:0width$}", index, width = width)
}

/// Replace `object`'s extension (`ext`, with dot) by `suffix` appended directly.
///
/// `temp/p.1.RDD.main.cpp.o` with suffix `2o` becomes `temp/p.1.RDD.main.cpp2o`.
pub fn sibling_of_object(object: &Path, ext: &str, suffix: &str) -> PathBuf {
    let text = object.to_string_lossy();
    let base = text.strip_suffix(ext).unwrap_or(&text);
    PathBuf::from(format!("{}{}", base, suffix))
}

/// Prefix of the macros describing the build configuration to the sources.
pub const COMPILE_DEFINE_PREFIX: &str = "XYO_COMPILE_";

/// Build-configuration macro name, e.g. `XYO_COMPILE_RELEASE`.
pub fn compile_define(suffix: &str) -> String {
    format!("{}{}", COMPILE_DEFINE_PREFIX, suffix)
}

/// Double-quote a value for a response file.
pub fn quoted(value: impl AsRef<str>) -> String {
    format!("\"{}\"", value.as_ref())
}

pub fn forward_slashes(path: impl AsRef<Path>) -> String {
    path.as_ref().to_string_lossy().replace('\\', "/")
}

pub fn backslashes(path: impl AsRef<Path>) -> String {
    path.as_ref().to_string_lossy().replace('/', "\\")
}

/// `:name` asks for an exact library file name rather than `-lname` lookup.
pub fn is_exact_library(library: &str) -> bool {
    library.starts_with(':')
}

/// Libraries ending in `.static` are linked from their archive.
pub fn is_static_library(library: &str) -> bool {
    library.ends_with(".static")
}
