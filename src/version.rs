//! Driver version information.
//!
//! Exposes the version as a single constant so the usage banner, `--version`
//! and the harness CLI agree on the same value.
//!
//! ## Notes
//!
//! - The value is taken from Cargo metadata (`CARGO_PKG_VERSION`) at compile time.
//! - Prefer this constant over repeating `env!("CARGO_PKG_VERSION")` in multiple places.

/// The driver version string (for example, `0.1.0`).
pub const DRIVER_VERSION: &str = env!("CARGO_PKG_VERSION");
