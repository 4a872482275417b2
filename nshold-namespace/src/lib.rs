//! Persistent namespace sets for isolated virtual devices
//!
//! This crate creates mount, network and IPC namespaces held open by a
//! detached holder process, persists them by name, and lets other processes
//! open or enter them later:
//! - Path resolution - name to persisted file
//! - Holder launch - clone into fresh namespaces and park
//! - Binding - link the holder's namespaces into the directory
//! - Access and switching - open handles and `setns` into them

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod accessor;
pub mod binder;
pub mod config;
pub mod directory;
pub mod holder;
pub mod info;
pub mod manager;
pub mod paths;
pub mod switcher;

pub use binder::NamespaceBinder;
pub use config::{ANDROID_NAMESPACE, DEFAULT_ROOT, ManagerConfig, OUTER_NAMESPACE};
pub use holder::HolderLauncher;
pub use info::NamespaceInfo;
pub use manager::{CreateReport, NetworkNamespaceManager};
pub use paths::NamespacePaths;

pub use nshold_core::{Error, NamespaceKind, NamespaceName, ProcessId, Report, Result, Severity, Step};
