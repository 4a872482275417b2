//! Per-step failure policy
//!
//! Every OS action performed while creating or entering a namespace set is a
//! [`Step`]. Each step has a fixed [`Severity`]: fatal failures abort the
//! operation with an [`Error`](crate::Error), the others are logged and
//! collected in a [`Report`] so callers can see what was tolerated.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::NamespaceKind;

/// How a failed step affects the operation it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The operation fails
    Fatal,
    /// The operation continues, but part of the result is unusable
    Degraded,
    /// The operation continues as if the step succeeded
    Ignored,
}

/// A single OS action inside a namespace operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Creating the persisted-namespace directory
    RootDirectory,
    /// Cloning the holder process
    Clone,
    /// Making the holder's mounts stop propagating back to the host
    IsolateMounts,
    /// Detaching the inherited `/sys` inside the holder
    DetachSys,
    /// Mounting a fresh `sysfs` inside the holder
    MountSys,
    /// Opening the socket used for the paranoid latch
    ParanoidSocket,
    /// Issuing the paranoid networking ioctl
    ParanoidLatch,
    /// Linking one of the holder's namespaces into the directory
    Symlink(NamespaceKind),
    /// Writing the holder pid record
    PidRecord,
    /// Leaving the caller's mount namespace before switching
    Unshare,
    /// Opening a persisted namespace handle
    Open(NamespaceKind),
    /// Entering a namespace
    SetNs(NamespaceKind),
}

impl Step {
    /// Failure policy of this step
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::Symlink(_) => Severity::Degraded,
            Self::ParanoidSocket | Self::ParanoidLatch | Self::Unshare => Severity::Ignored,
            Self::RootDirectory
            | Self::Clone
            | Self::IsolateMounts
            | Self::DetachSys
            | Self::MountSys
            | Self::PidRecord
            | Self::Open(_)
            | Self::SetNs(_) => Severity::Fatal,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootDirectory => f.write_str("root directory"),
            Self::Clone => f.write_str("clone"),
            Self::IsolateMounts => f.write_str("isolate mounts"),
            Self::DetachSys => f.write_str("detach /sys"),
            Self::MountSys => f.write_str("mount /sys"),
            Self::ParanoidSocket => f.write_str("paranoid socket"),
            Self::ParanoidLatch => f.write_str("paranoid latch"),
            Self::Symlink(kind) => write!(f, "symlink {kind}"),
            Self::PidRecord => f.write_str("pid record"),
            Self::Unshare => f.write_str("unshare"),
            Self::Open(kind) => write!(f, "open {kind}"),
            Self::SetNs(kind) => write!(f, "setns {kind}"),
        }
    }
}

/// A tolerated failure of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    /// Step that failed
    pub step: Step,
    /// Diagnostic including the OS error text
    pub message: String,
}

impl StepFailure {
    /// Severity of the failed step
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.step.severity()
    }
}

/// Non-fatal failures collected during one operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    failures: Vec<StepFailure>,
}

impl Report {
    /// Create an empty report
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tolerated failure and log it
    pub fn record(&mut self, step: Step, error: impl fmt::Display) {
        let message = error.to_string();
        match step.severity() {
            Severity::Degraded => tracing::warn!(%step, error = %message, "Step failed, continuing degraded"),
            Severity::Ignored => tracing::warn!(%step, error = %message, "Step failed, ignoring"),
            Severity::Fatal => tracing::error!(%step, error = %message, "Fatal step recorded as tolerated"),
        }
        self.failures.push(StepFailure { step, message });
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: Self) {
        self.failures.extend(other.failures);
    }

    /// All recorded failures, in order
    #[must_use]
    pub fn failures(&self) -> &[StepFailure] {
        &self.failures
    }

    /// True when no step failed
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// True when at least one degrading failure was recorded
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.failures
            .iter()
            .any(|f| f.severity() == Severity::Degraded)
    }

    /// True when `step` failed and the failure was tolerated
    #[must_use]
    pub fn tolerated(&self, step: Step) -> bool {
        self.failures.iter().any(|f| f.step == step)
    }
}
