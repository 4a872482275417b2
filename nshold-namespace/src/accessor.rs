//! Opening persisted namespace handles

use std::fs::File;
use std::io::ErrorKind;
use std::os::fd::OwnedFd;
use tracing::error;

use nshold_core::{Error, NamespaceKind, NamespaceName, Result};

use crate::paths::NamespacePaths;

/// Open the persisted `kind` handle of `name` read-only
///
/// A missing handle, including a link whose holder is gone, is reported as
/// [`Error::NotFound`].
pub fn open_namespace(
    paths: &NamespacePaths,
    name: &NamespaceName,
    kind: NamespaceKind,
) -> Result<OwnedFd> {
    let path = paths.namespace_path(name, kind);

    // std retries the open on EINTR
    match File::open(&path) {
        Ok(file) => Ok(OwnedFd::from(file)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            error!(name = %name, %kind, path = %path.display(), "Namespace not found");
            Err(Error::NotFound {
                name: name.clone(),
                kind,
                path,
            })
        }
        Err(e) => {
            error!(name = %name, %kind, path = %path.display(), error = %e, "Failed to open namespace");
            Err(Error::Open {
                kind,
                path,
                source: e,
            })
        }
    }
}

/// Open the network namespace of `name`, ready to hand to `setns`
pub fn open_descriptor(paths: &NamespacePaths, name: &NamespaceName) -> Result<OwnedFd> {
    open_namespace(paths, name, NamespaceKind::Network)
}
