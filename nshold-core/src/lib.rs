//! nshold Core - Foundation types, errors, and step reports
//!
//! This crate provides the core abstractions shared by the namespace holder
//! crates.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod report;
pub mod types;

pub use error::{Error, Result};
pub use report::{Report, Severity, Step, StepFailure};
pub use types::{NamespaceKind, NamespaceName, ProcessId};
