//! Configuration for membership-registry

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::context::Principal;
use crate::error::{RegistryError, Result};
use crate::validation::FieldLimits;

/// Registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Field length and count bounds
    #[serde(default)]
    pub limits: FieldLimits,

    /// Principal allowed to remove any member (none by default)
    #[serde(default)]
    pub admin: Option<Principal>,

    /// Delete grant, activity and reputation rows together with the profile
    #[serde(default)]
    pub cascade_on_remove: bool,

    /// SQLite database file; in-memory storage when unset
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            limits: FieldLimits::default(),
            admin: None,
            cascade_on_remove: false,
            database_path: None,
        }
    }
}

impl RegistryConfig {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse config from a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| RegistryError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| RegistryError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.limits.check_consistent()?;
        if let Some(admin) = &self.admin {
            if admin.as_str().is_empty() {
                return Err(RegistryError::Config("admin principal cannot be empty".to_string()));
            }
        }
        Ok(())
    }

    pub fn is_admin(&self, principal: &Principal) -> bool {
        self.admin.as_ref() == Some(principal)
    }
}
