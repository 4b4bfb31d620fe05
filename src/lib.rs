#![forbid(unsafe_code)]
//! C/C++ Compiler Command Driver
//!
//! Turns a flat option list (usually read from `@argument` files or JSON project
//! manifests) into compiler, archiver and linker invocations for GCC or MSVC,
//! rebuilding only what changed and compiling in parallel.
//!
//! The crate also ships the smoke-test harness that exercises the driver
//! binary against a pair of fixed argument files.
//!
//! ## Layout
//!
//! - `driver` - toolchain-independent build core (options, staleness, queue, pipeline)
//!   and the GCC/MSVC command generators
//! - `process` - subprocess invocation boundary
//! - `harness` - the sequential smoke-test plan
//! - `cli` - option parsing, argument-file expansion and the binaries' entry points
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module
//!   enforces `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod driver;
pub mod harness;
pub mod process;
pub mod version;

pub use driver::{BuildOptions, Crt, Linkage, Profile, Target, Toolchain};
pub use harness::{HarnessError, HarnessPlan, run_plan};
pub use process::{Invocation, ProcessExit, ProcessRunner, SystemRunner};
