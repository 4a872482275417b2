//! OS abstraction for namespace holders with pluggable clients
//!
//! This crate provides a trait-based abstraction over the handful of Linux
//! system calls used to create, persist and enter namespaces, including a
//! production client and a recording mock.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod client;
pub mod linux;
pub mod mock;

pub use client::{EntryFn, ProcessHandle, SysClient};
pub use linux::LinuxSysClient;
pub use mock::{MockSysClient, SysCall, SysOp};
