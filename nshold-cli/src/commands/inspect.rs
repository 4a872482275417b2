//! Inspect command implementation

use anyhow::{Context, Result};
use nshold_namespace::{NamespaceInfo, NamespaceName, NetworkNamespaceManager, ProcessId};

pub fn execute_pid(pid: Option<i32>) -> Result<()> {
    let target = pid.map_or_else(ProcessId::current, ProcessId::from_raw);

    println!("Namespace Information for PID {target}");
    println!("{:-<60}", "");

    let info = NamespaceInfo::for_pid(target).context("Failed to get namespace information")?;
    print!("{info}");

    Ok(())
}

pub fn execute_name(manager: &NetworkNamespaceManager, name: &str) -> Result<()> {
    let name = NamespaceName::new(name);

    println!("Namespace Information for {name}");
    println!("{:-<60}", "");

    match manager.holder_pid(&name) {
        Ok(pid) => println!("Holder PID: {pid}"),
        Err(e) => println!("Holder PID: unknown ({e})"),
    }

    let info = manager.namespace_info(&name);
    if info.is_empty() {
        anyhow::bail!("Namespace {name} not found under {}", manager.paths().root().display());
    }
    print!("{info}");

    Ok(())
}
