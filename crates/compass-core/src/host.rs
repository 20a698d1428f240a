//! Host collaborator boundary
//!
//! The engine never touches documents or the filesystem directly; target
//! files are acquired through a [`Host`]. Hosting applications resolve open
//! editor documents first (with their live edit version) and fall back to
//! disk.

use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Target-file acquisition: current text plus a revision number that
/// changes whenever the content does.
pub trait Host {
    fn fetch(&self, path: &Path) -> io::Result<(String, u64)>;
}

/// Plain filesystem host. The revision is the file's modification time in
/// seconds, so an on-disk edit invalidates cached trees.
#[derive(Debug, Clone, Default)]
pub struct FsHost;

impl Host for FsHost {
    fn fetch(&self, path: &Path) -> io::Result<(String, u64)> {
        let content = std::fs::read_to_string(path)?;
        let revision = std::fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|duration| duration.as_secs())
            .unwrap_or(0);
        Ok((content, revision))
    }
}
