//! Configuration for the classification engine.
//!
//! Strongly-typed configuration with TOML support: provider display data for
//! the policy store, per-family enablement, and logging preferences for the
//! hosting process.

use crate::callout::Callout;
use crate::error::{EngineError, Result};
use crate::layer::AddressFamily;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Provider display data
    pub provider: ProviderConfig,

    /// Address family enablement
    pub families: FamiliesConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            families: FamiliesConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Serialize to a TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.provider.name.trim().is_empty() {
            return Err(EngineError::config_value(
                "provider.name",
                "Display name must not be empty",
            ));
        }

        if !self.families.ipv4 && !self.families.ipv6 {
            return Err(EngineError::config_value(
                "families",
                "At least one address family must be enabled",
            ));
        }

        Ok(())
    }
}

/// Provider display data used for policy-store descriptors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Name prefix for callout display names
    pub name: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "Flowsplit".to_string(),
        }
    }
}

impl ProviderConfig {
    /// Display description for a callout purpose
    pub fn description_for(&self, purpose: Callout) -> String {
        match purpose {
            Callout::BindRedirect => "Redirects certain binds away from tunnel interface".to_string(),
            Callout::PermitSplit => "Permits selected connections outside the tunnel".to_string(),
            Callout::BlockSplit => "Blocks unwanted connections in relation to splitting".to_string(),
        }
    }
}

/// Which address families the purpose-sets register for
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FamiliesConfig {
    /// Register IPv4 layers
    pub ipv4: bool,
    /// Register IPv6 layers
    pub ipv6: bool,
}

impl Default for FamiliesConfig {
    fn default() -> Self {
        Self {
            ipv4: true,
            ipv6: true,
        }
    }
}

impl FamiliesConfig {
    /// Whether a family is enabled
    pub fn enabled(&self, family: AddressFamily) -> bool {
        match family {
            AddressFamily::V4 => self.ipv4,
            AddressFamily::V6 => self.ipv6,
        }
    }
}

/// Logging configuration for the hosting process
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Enable JSON format logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}
