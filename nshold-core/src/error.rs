//! Error types for nshold

use std::path::PathBuf;
use thiserror::Error;

use crate::{NamespaceKind, NamespaceName, ProcessId, Step};

/// nshold error types
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// System error from nix
    #[error("System error: {0}")]
    System(#[from] nix::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// The persisted-namespace directory could not be created
    #[error("Failed to create namespace directory {}: {source}", path.display())]
    RootDirectory {
        /// Directory that was requested
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Cloning the holder process failed
    #[error("Failed to spawn holder for {name}: {source}")]
    Spawn {
        /// Namespace being created
        name: NamespaceName,
        /// Underlying error
        source: nix::Error,
    },

    /// The holder exited before it finished preparing its namespaces
    #[error("Holder {pid} for {name} exited before it was ready")]
    HolderNotReady {
        /// Namespace being created
        name: NamespaceName,
        /// Holder process id
        pid: ProcessId,
    },

    /// A fatal step inside the holder failed
    #[error("Holder setup failed at {step}: {source}")]
    HolderSetup {
        /// Step that failed
        step: Step,
        /// Underlying error
        source: nix::Error,
    },

    /// The pid record could not be created exclusively
    #[error("Failed to create pid record {}: {source}", path.display())]
    PidRecord {
        /// Pid record path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The pid record was not fully written
    #[error("Short write to pid record {}: wrote {written} of {expected} bytes", path.display())]
    ShortWrite {
        /// Pid record path
        path: PathBuf,
        /// Bytes written
        written: usize,
        /// Bytes expected
        expected: usize,
    },

    /// No persisted handle exists for the name
    #[error("Namespace {kind} for {name} not found at {}", path.display())]
    NotFound {
        /// Requested namespace name
        name: NamespaceName,
        /// Requested kind
        kind: NamespaceKind,
        /// Resolved path
        path: PathBuf,
    },

    /// A persisted handle exists but could not be opened
    #[error("Failed to open {kind} handle {}: {source}", path.display())]
    Open {
        /// Requested kind
        kind: NamespaceKind,
        /// Resolved path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Entering a namespace failed
    #[error("Could not enter {kind} namespace of {name}: {source}")]
    SetNs {
        /// Requested namespace name
        name: NamespaceName,
        /// Kind that failed
        kind: NamespaceKind,
        /// Underlying error
        source: nix::Error,
    },

    /// A switch stopped part way; `switched` kinds remain entered
    #[error("Switch to {name} stopped after entering {switched:?}: {source}")]
    PartialSwitch {
        /// Requested namespace name
        name: NamespaceName,
        /// Kinds entered before the failure
        switched: Vec<NamespaceKind>,
        /// Failure of the next kind
        source: Box<Error>,
    },
}

impl Error {
    /// The fatal step this error stems from, if any
    #[must_use]
    pub fn step(&self) -> Option<Step> {
        match self {
            Self::RootDirectory { .. } => Some(Step::RootDirectory),
            Self::Spawn { .. } => Some(Step::Clone),
            Self::HolderSetup { step, .. } => Some(*step),
            Self::PidRecord { .. } | Self::ShortWrite { .. } => Some(Step::PidRecord),
            Self::NotFound { kind, .. } | Self::Open { kind, .. } => Some(Step::Open(*kind)),
            Self::SetNs { kind, .. } => Some(Step::SetNs(*kind)),
            Self::PartialSwitch { source, .. } => source.step(),
            _ => None,
        }
    }

    /// True when the error means a persisted handle does not exist
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::PartialSwitch { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

/// Result type alias for nshold operations
pub type Result<T> = std::result::Result<T, Error>;
