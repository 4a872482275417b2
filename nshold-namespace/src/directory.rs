//! Persisted-namespace root directory

use std::fs::DirBuilder;
use std::os::unix::fs::DirBuilderExt;
use std::path::Path;
use tracing::{debug, error};

use nshold_core::{Error, Result};

/// `rwxr-xr-x`
pub const ROOT_MODE: u32 = 0o755;

/// Create `root` and its parents if they do not exist
///
/// An existing directory is accepted as is; its mode is left untouched.
pub fn ensure_root(root: &Path) -> Result<()> {
    debug!(root = %root.display(), "Ensuring namespace directory");

    DirBuilder::new()
        .recursive(true)
        .mode(ROOT_MODE)
        .create(root)
        .map_err(|e| {
            error!(root = %root.display(), error = %e, "Failed to create namespace directory");
            Error::RootDirectory {
                path: root.to_path_buf(),
                source: e,
            }
        })
}
