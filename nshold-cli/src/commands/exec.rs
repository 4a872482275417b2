//! Exec command implementation

use std::ffi::CString;

use anyhow::{Context, Result};
use nshold_namespace::{NamespaceName, NetworkNamespaceManager};

pub fn execute(manager: &NetworkNamespaceManager, name: &str, command: &[String]) -> Result<()> {
    let name = NamespaceName::new(name);

    let report = manager
        .switch_namespace(&name)
        .with_context(|| format!("Failed to enter namespace {name}"))?;
    if !report.is_clean() {
        tracing::debug!(name = %name, failures = report.failures().len(), "Switched with tolerated failures");
    }

    let args = command
        .iter()
        .map(|arg| CString::new(arg.as_str()))
        .collect::<Result<Vec<_>, _>>()
        .context("Command contains a NUL byte")?;
    let program = args.first().context("No command given")?;

    tracing::debug!(name = %name, command = ?command, "Executing in namespace");

    let Err(err) = nix::unistd::execvp(program, &args);
    Err(err).with_context(|| format!("Failed to execute {}", program.to_string_lossy()))
}
