use anyhow::{Context, Result};
use nshold_namespace::{ManagerConfig, NetworkNamespaceManager};

use crate::cli::{Cli, Commands};

pub mod create;
pub mod descriptor;
pub mod exec;
pub mod inspect;
pub mod version;

/// Dispatch command to appropriate handler
pub fn dispatch(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Create {
            name,
            shared_network,
            paranoid,
            wait,
        } => {
            let config = load_config(cli)?.with_wait_for_holder(*wait);
            create::execute(config, name, !shared_network, *paranoid)
        }

        Commands::Descriptor { name } => descriptor::execute(&manager(cli)?, name),

        Commands::Exec { name, command } => exec::execute(&manager(cli)?, name, command),

        Commands::Inspect { name, pid } => match name {
            Some(name) => inspect::execute_name(&manager(cli)?, name),
            None => inspect::execute_pid(*pid),
        },

        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}

/// Build the manager configuration from `--config` and `--root`
fn load_config(cli: &Cli) -> Result<ManagerConfig> {
    let mut config = match &cli.config {
        Some(path) => ManagerConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ManagerConfig::default(),
    };

    if let Some(root) = &cli.root {
        config = config.with_root(root);
    }

    Ok(config)
}

fn manager(cli: &Cli) -> Result<NetworkNamespaceManager> {
    NetworkNamespaceManager::linux(load_config(cli)?)
        .context("Failed to prepare namespace directory")
}
