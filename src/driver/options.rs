//! Build option model
//!
//! Profile, C runtime and linkage are independent choices; the one cross-rule
//! is that an x-static dynamic library always links the static runtime.

use std::fmt;

/// Optimisation/debug profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    #[default]
    Release,
    Debug,
}

/// C runtime linkage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Crt {
    #[default]
    Dynamic,
    Static,
}

/// Linkage of the artifact being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Linkage {
    Static,
    #[default]
    Dynamic,
    /// Dynamic library whose objects are compiled as for a static library.
    DynamicXStatic,
}

/// What the link step produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    StaticLibrary,
    DynamicLibrary,
    Executable,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::StaticLibrary => write!(f, "library"),
            Artifact::DynamicLibrary => write!(f, "dynamic library"),
            Artifact::Executable => write!(f, "executable"),
        }
    }
}

/// Normalised option set passed to a toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildOptions {
    pub profile: Profile,
    pub crt: Crt,
    pub linkage: Linkage,
}

impl BuildOptions {
    pub fn new(profile: Profile, crt: Crt, linkage: Linkage) -> Self {
        Self { profile, crt, linkage }.normalized()
    }

    /// Options for an executable: linkage follows the runtime choice.
    pub fn for_executable(profile: Profile, crt: Crt) -> Self {
        let linkage = match crt {
            Crt::Static => Linkage::Static,
            Crt::Dynamic => Linkage::Dynamic,
        };
        Self::new(profile, crt, linkage)
    }

    pub fn normalized(mut self) -> Self {
        if self.linkage == Linkage::DynamicXStatic {
            self.crt = Crt::Static;
        }
        self
    }

    pub fn is_debug(&self) -> bool {
        self.profile == Profile::Debug
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.linkage, Linkage::Dynamic | Linkage::DynamicXStatic)
    }

    /// Three-letter tag embedded in object file names, e.g. `RDD`.
    ///
    /// Objects built with different options never share a file.
    pub fn tag(&self) -> String {
        let profile = match self.profile {
            Profile::Release => 'R',
            Profile::Debug => 'D',
        };
        let crt = match self.crt {
            Crt::Static => 'S',
            Crt::Dynamic => 'D',
        };
        let linkage = if self.is_dynamic() { 'D' } else { 'S' };
        [profile, crt, linkage].iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tag() {
        assert_eq!(BuildOptions::default().tag(), "RDD");
    }

    #[test]
    fn test_x_static_forces_static_crt() {
        let opts = BuildOptions::new(Profile::Release, Crt::Dynamic, Linkage::DynamicXStatic);
        assert_eq!(opts.crt, Crt::Static);
        assert!(opts.is_dynamic());
        assert_eq!(opts.tag(), "RSD");
    }

    #[test]
    fn test_executable_linkage_follows_crt() {
        assert_eq!(BuildOptions::for_executable(Profile::Debug, Crt::Static).tag(), "DSS");
        assert_eq!(BuildOptions::for_executable(Profile::Release, Crt::Dynamic).tag(), "RDD");
    }

    #[test]
    fn test_artifact_display() {
        assert_eq!(Artifact::StaticLibrary.to_string(), "library");
        assert_eq!(Artifact::DynamicLibrary.to_string(), "dynamic library");
        assert_eq!(Artifact::Executable.to_string(), "executable");
    }
}
