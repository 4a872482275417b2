//! Create command implementation

use anyhow::{Context, Result};
use nshold_namespace::{ManagerConfig, NamespaceName, NetworkNamespaceManager};

pub fn execute(
    config: ManagerConfig,
    name: &str,
    new_namespace_set: bool,
    paranoid: bool,
) -> Result<()> {
    // Validate we're root
    if !nix::unistd::geteuid().is_root() {
        anyhow::bail!("Must run as root (try: sudo nshold create ...)");
    }

    let manager = NetworkNamespaceManager::linux(config)
        .context("Failed to prepare namespace directory")?;
    let name = NamespaceName::new(name);

    let created = manager
        .create_network_namespace(&name, new_namespace_set, paranoid)
        .with_context(|| format!("Failed to create namespace {name}"))?;

    println!("Namespace:  {}", created.name);
    println!("Holder PID: {}", created.pid);
    println!(
        "Record:     {}",
        manager.paths().pid_record_path(&name).display()
    );

    for failure in created.report.failures() {
        println!("Warning:    {} failed: {}", failure.step, failure.message);
    }

    Ok(())
}
