//! Descriptor command implementation

use std::os::fd::AsRawFd;

use anyhow::{Context, Result};
use nshold_namespace::{NamespaceKind, NamespaceName, NetworkNamespaceManager};

pub fn execute(manager: &NetworkNamespaceManager, name: &str) -> Result<()> {
    let name = NamespaceName::new(name);

    let fd = manager
        .namespace_descriptor(&name)
        .with_context(|| format!("Failed to open namespace {name}"))?;

    println!("Descriptor: {}", fd.as_raw_fd());
    if let Some(id) = manager.namespace_info(&name).get(NamespaceKind::Network) {
        println!("Namespace:  {id}");
    }

    Ok(())
}
