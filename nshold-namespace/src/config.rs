//! Manager configuration and well-known namespace names

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use nshold_core::{Error, Result};

/// Directory hosting persisted namespaces
///
/// Any directory works; this one is where `ip netns` looks as well.
pub const DEFAULT_ROOT: &str = "/var/run/netns";

/// Default prefix of holder process labels
pub const DEFAULT_LABEL_PREFIX: &str = "nshold.ns.";

/// Name of the namespace set on the device side of a virtual device
pub const ANDROID_NAMESPACE: &str = "android";

/// Name of the namespace set on the host side of a virtual device
pub const OUTER_NAMESPACE: &str = "outer";

/// Namespace manager configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Directory hosting persisted namespace handles
    pub root: PathBuf,

    /// Wait for the holder to report its namespaces ready before binding
    pub wait_for_holder: bool,

    /// Prefix of holder process labels
    pub label_prefix: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            wait_for_holder: false,
            label_prefix: DEFAULT_LABEL_PREFIX.to_string(),
        }
    }
}

impl ManagerConfig {
    /// Create a new configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON configuration file; missing fields take defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| Error::InvalidConfig {
            message: format!("{}: {e}", path.display()),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Set the persisted-namespace directory
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Enable or disable the holder readiness handshake
    #[must_use]
    pub const fn with_wait_for_holder(mut self, enable: bool) -> Self {
        self.wait_for_holder = enable;
        self
    }

    /// Set the holder label prefix
    #[must_use]
    pub fn with_label_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.label_prefix = prefix.into();
        self
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.root.as_os_str().is_empty() {
            return Err(Error::InvalidConfig {
                message: "Namespace root cannot be empty".to_string(),
            });
        }

        if !self.root.is_absolute() {
            return Err(Error::InvalidConfig {
                message: format!("Namespace root must be absolute: {}", self.root.display()),
            });
        }

        if self.label_prefix.contains('\0') {
            return Err(Error::InvalidConfig {
                message: "Label prefix cannot contain NUL".to_string(),
            });
        }

        Ok(())
    }

    /// Label given to the holder of `name`
    ///
    /// The name is cut at its first NUL byte, which cannot be part of a
    /// process name.
    #[must_use]
    pub fn holder_label(&self, name: &str) -> String {
        let visible = name.find('\0').map_or(name, |end| &name[..end]);
        format!("{}{visible}", self.label_prefix)
    }
}
