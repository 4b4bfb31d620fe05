//! Timestamp-based rebuild decisions

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Last modification time, `None` when the file is missing or unreadable.
pub fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Set a file's modification time to now. Missing files are left alone.
pub fn touch_if_exists(path: &Path) -> io::Result<()> {
    if !path.is_file() {
        return Ok(());
    }
    let file = OpenOptions::new().write(true).open(path)?;
    file.set_modified(SystemTime::now())
}

/// `target` is missing or older than any existing dependency.
pub fn is_stale(target: &Path, deps: &[PathBuf]) -> bool {
    let Some(built) = modified(target) else {
        return true;
    };
    deps.iter().filter_map(|d| modified(d)).any(|t| t > built)
}

/// Newest modification time among a header list, read once per target.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderStamp {
    newest: Option<SystemTime>,
}

impl HeaderStamp {
    pub fn scan(headers: &[PathBuf]) -> Self {
        Self {
            newest: headers.iter().filter_map(|h| modified(h)).max(),
        }
    }

    /// A header changed after `file` was last written.
    pub fn is_newer_than(&self, file: &Path) -> bool {
        match (self.newest, modified(file)) {
            (Some(header), Some(file)) => file < header,
            _ => false,
        }
    }
}

/// Why a translation unit does or does not need compiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    UpToDate,
    /// A header is newer than the source; the source has been touched.
    HeadersChanged,
    ObjectMissing,
    ObjectOutdated,
}

impl SourceState {
    pub fn needs_compile(self) -> bool {
        self != SourceState::UpToDate
    }
}

/// Decide whether `source` must be compiled into `object`.
///
/// A source older than one of its headers is touched first, so the next run
/// sees it as newer than the headers and only the object comparison remains.
pub fn source_state(source: &Path, object: &Path, headers: &HeaderStamp) -> io::Result<SourceState> {
    if headers.is_newer_than(source) {
        touch_if_exists(source)?;
        return Ok(SourceState::HeadersChanged);
    }
    let state = match (modified(object), modified(source)) {
        (None, _) => SourceState::ObjectMissing,
        (Some(obj), Some(src)) if obj < src => SourceState::ObjectOutdated,
        _ => SourceState::UpToDate,
    };
    Ok(state)
}
