//! Namespace lifecycle management

use std::os::fd::OwnedFd;
use std::sync::Arc;

use nshold_core::{Error, NamespaceName, ProcessId, Report, Result};
use nshold_sys::{LinuxSysClient, SysClient};

use crate::accessor;
use crate::binder::NamespaceBinder;
use crate::config::ManagerConfig;
use crate::directory::ensure_root;
use crate::holder::HolderLauncher;
use crate::info::NamespaceInfo;
use crate::paths::NamespacePaths;
use crate::switcher;

/// Outcome of a successful namespace creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateReport {
    /// Name the namespace set was persisted as
    pub name: NamespaceName,
    /// Holder process id
    pub pid: ProcessId,
    /// Tolerated failures, e.g. kinds that could not be linked
    pub report: Report,
}

/// Creates, persists and enters named namespace sets
///
/// Construction creates the namespace directory; a manager never exists
/// without it. Operations are synchronous and unsynchronized: concurrent
/// creations of one name race on the exclusive pid record and exactly one
/// wins.
pub struct NetworkNamespaceManager {
    sys: Arc<dyn SysClient>,
    config: ManagerConfig,
    paths: NamespacePaths,
    launcher: HolderLauncher,
    binder: NamespaceBinder,
}

impl NetworkNamespaceManager {
    /// Create a namespace manager
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the namespace
    /// directory cannot be created
    pub fn new(sys: Arc<dyn SysClient>, config: ManagerConfig) -> Result<Self> {
        config.validate()?;
        ensure_root(&config.root)?;

        let paths = NamespacePaths::new(config.root.clone());
        let launcher = HolderLauncher::new(Arc::clone(&sys), &config);
        let binder = NamespaceBinder::new(paths.clone());

        tracing::debug!(root = %config.root.display(), "Namespace manager ready");

        Ok(Self {
            sys,
            config,
            paths,
            launcher,
            binder,
        })
    }

    /// Create a namespace manager issuing real syscalls
    ///
    /// # Errors
    /// Returns error if the namespace directory cannot be created
    pub fn linux(config: ManagerConfig) -> Result<Self> {
        Self::new(Arc::new(LinuxSysClient::new()), config)
    }

    /// Get the configuration
    #[must_use]
    pub const fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Get the path resolver
    #[must_use]
    pub const fn paths(&self) -> &NamespacePaths {
        &self.paths
    }

    /// Create a namespace set named `name`
    ///
    /// With `new_namespace_set` the holder gets fresh mount, network and IPC
    /// namespaces; without it only the mount namespace is new. `paranoid`
    /// latches paranoid networking inside the holder, best effort.
    ///
    /// # Errors
    /// Returns error if the holder cannot be cloned or the pid record cannot
    /// be written. A holder and links created before the failure are left in
    /// place.
    pub fn create_network_namespace(
        &self,
        name: &NamespaceName,
        new_namespace_set: bool,
        paranoid: bool,
    ) -> Result<CreateReport> {
        tracing::info!(name = %name, new_namespace_set, paranoid, "Creating namespace");

        let pid = self
            .launcher
            .spawn(name, new_namespace_set, paranoid)?
            .detach();

        let report = self.binder.persist(name, pid).inspect_err(|e| {
            tracing::error!(
                name = %name,
                pid = pid.as_raw(),
                error = %e,
                "Namespace creation failed, holder left running"
            );
        })?;

        tracing::info!(name = %name, pid = pid.as_raw(), "Initialized namespace");

        Ok(CreateReport {
            name: name.clone(),
            pid,
            report,
        })
    }

    /// Open the network namespace of `name`
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if `name` was never created or its holder
    /// is gone
    pub fn namespace_descriptor(&self, name: &NamespaceName) -> Result<OwnedFd> {
        accessor::open_descriptor(&self.paths, name)
    }

    /// Move the calling process into every namespace of `name`
    ///
    /// # Errors
    /// Returns [`Error::PartialSwitch`] naming the kinds already entered;
    /// those are not rolled back
    pub fn switch_namespace(&self, name: &NamespaceName) -> Result<Report> {
        switcher::switch_namespace(self.sys.as_ref(), &self.paths, name)
    }

    /// Read the holder pid recorded for `name`
    ///
    /// # Errors
    /// Returns error if the record is missing or malformed
    pub fn holder_pid(&self, name: &NamespaceName) -> Result<ProcessId> {
        let path = self.paths.pid_record_path(name);
        let raw = std::fs::read_to_string(&path).map_err(|e| Error::PidRecord {
            path: path.clone(),
            source: e,
        })?;
        raw.parse()
    }

    /// Namespace identifiers behind the persisted handles of `name`
    #[must_use]
    pub fn namespace_info(&self, name: &NamespaceName) -> NamespaceInfo {
        NamespaceInfo::for_name(&self.paths, name)
    }
}

impl std::fmt::Debug for NetworkNamespaceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkNamespaceManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
