//! Driver configuration: environment snapshot and target selection.

use std::env;

/// Environment variable that switches the default profile to debug.
pub const ENV_COMPILE_DEBUG: &str = "XYO_COMPILE_DEBUG";
/// Environment variable with space-separated defines added to every build.
pub const ENV_COMPILE_DEFINE: &str = "XYO_COMPILE_DEFINE";

/// Snapshot of the environment variables the driver reads.
///
/// Taken once at startup so the rest of the driver (including worker threads)
/// never consults the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
    /// C compiler override (`CC`)
    pub cc: Option<String>,
    /// C++ compiler/linker override (`CXX`)
    pub cxx: Option<String>,
    /// `XYO_COMPILE_DEBUG` is present
    pub debug: bool,
    /// Defines from `XYO_COMPILE_DEFINE`
    pub defines: Vec<String>,
}

impl EnvConfig {
    /// Read the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary lookup (used by tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            cc: non_empty("CC"),
            cxx: non_empty("CXX"),
            debug: lookup(ENV_COMPILE_DEBUG).is_some(),
            defines: lookup(ENV_COMPILE_DEFINE)
                .map(|v| v.split(' ').filter(|d| !d.is_empty()).map(str::to_string).collect())
                .unwrap_or_default(),
        }
    }

    pub fn with_cc(mut self, cc: impl Into<String>) -> Self {
        self.cc = Some(cc.into());
        self
    }

    pub fn with_cxx(mut self, cxx: impl Into<String>) -> Self {
        self.cxx = Some(cxx.into());
        self
    }

    pub fn c_compiler<'a>(&'a self, default: &'a str) -> &'a str {
        self.cc.as_deref().unwrap_or(default)
    }

    pub fn cxx_compiler<'a>(&'a self, default: &'a str) -> &'a str {
        self.cxx.as_deref().unwrap_or(default)
    }
}

/// Compiler family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainKind {
    Gcc,
    Msvc,
}

/// Operating system family of the build target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOs {
    Windows,
    Unix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerWidth {
    Bits32,
    Bits64,
}

/// Toolchain plus the target properties that change generated commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub toolchain: ToolchainKind,
    pub os: TargetOs,
    pub width: PointerWidth,
}

impl Target {
    /// The target the driver itself was built for.
    pub fn host() -> Self {
        Self {
            toolchain: if cfg!(target_env = "msvc") {
                ToolchainKind::Msvc
            } else {
                ToolchainKind::Gcc
            },
            os: if cfg!(windows) { TargetOs::Windows } else { TargetOs::Unix },
            width: if cfg!(target_pointer_width = "64") {
                PointerWidth::Bits64
            } else {
                PointerWidth::Bits32
            },
        }
    }

    /// Host target, overridden by an explicit MSVC platform name.
    ///
    /// Only `win64-msvc` and `win32-msvc` (anywhere in the name) change the
    /// selection; every other platform name keeps the host toolchain.
    pub fn for_platform(platform: &str) -> Self {
        let mut target = Self::host();
        for (marker, width) in [("win64-msvc", PointerWidth::Bits64), ("win32-msvc", PointerWidth::Bits32)] {
            if platform.contains(marker) {
                target = Self {
                    toolchain: ToolchainKind::Msvc,
                    os: TargetOs::Windows,
                    width,
                };
            }
        }
        target
    }

    pub fn is_windows(&self) -> bool {
        self.os == TargetOs::Windows
    }

    pub fn is_64bit(&self) -> bool {
        self.width == PointerWidth::Bits64
    }
}

/// Platform name used when `--platform` is not given, e.g. `linux-64-gcc`.
pub fn default_platform_name() -> String {
    let host = Target::host();
    if host.toolchain == ToolchainKind::Msvc {
        let bits = if host.is_64bit() { 64 } else { 32 };
        return format!("win{}-msvc", bits);
    }
    let bits = if host.is_64bit() { "64" } else { "32" };
    format!("{}-{}-gcc", env::consts::OS, bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_defines_split_on_spaces() {
        let cfg = EnvConfig::from_lookup(lookup(&[(ENV_COMPILE_DEFINE, "A=1  B")]));
        assert_eq!(cfg.defines, vec!["A=1".to_string(), "B".to_string()]);
        assert!(!cfg.debug);
    }

    #[test]
    fn test_env_debug_presence_is_enough() {
        let cfg = EnvConfig::from_lookup(lookup(&[(ENV_COMPILE_DEBUG, "")]));
        assert!(cfg.debug);
    }

    #[test]
    fn test_empty_compiler_override_is_ignored() {
        let cfg = EnvConfig::from_lookup(lookup(&[("CXX", ""), ("CC", "clang")]));
        assert_eq!(cfg.cxx_compiler("gcc"), "gcc");
        assert_eq!(cfg.c_compiler("gcc"), "clang");
    }

    #[test]
    fn test_msvc_platform_overrides_host() {
        let t = Target::for_platform("win32-msvc-2022");
        assert_eq!(t.toolchain, ToolchainKind::Msvc);
        assert_eq!(t.os, TargetOs::Windows);
        assert_eq!(t.width, PointerWidth::Bits32);

        let t = Target::for_platform("win64-msvc");
        assert!(t.is_64bit());
    }

    #[test]
    fn test_other_platform_keeps_host() {
        assert_eq!(Target::for_platform("ubuntu-22.04"), Target::host());
    }
}
