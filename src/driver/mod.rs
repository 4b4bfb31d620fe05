//! Compiler driver core
//!
//! Everything here is independent of how the driver is invoked: option
//! parsing and argument files live in `cli`. The core plans commands through
//! a [`Toolchain`], runs them through a [`ProcessRunner`](crate::process::ProcessRunner)
//! and decides staleness from file timestamps.

pub mod config;
pub mod gcc;
pub mod incremental;
pub mod msvc;
pub mod options;
pub mod pipeline;
pub mod queue;
pub mod toolchain;

pub use config::{EnvConfig, Target, ToolchainKind};
pub use options::{Artifact, BuildOptions, Crt, Linkage, Profile};
pub use pipeline::{BuildContext, BuildError, TargetSpec, build_target};
pub use toolchain::{Language, Toolchain, select_toolchain};
