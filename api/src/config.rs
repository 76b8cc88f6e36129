//! Server configuration
//!
//! Loaded from a TOML file. Every section has defaults, so an empty or
//! missing file yields a working single-node setup.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:3000"
//!
//! [billing]
//! enabled = true
//! new_customer_free_credit = 1000
//! items.5f0a2c81d3 = { product = "prod_small", price = "price_small" }
//!
//! [license]
//! licensed = false
//! teams = 5
//!
//! [[catalog.instance_types]]
//! name = "small"
//!
//! [[catalog.team_types]]
//! name = "starter"
//! users = 5
//! instances.small = { active = true, limit = 2 }
//! trial = { instance_type = "small", duration = 14 }
//! ```

use anyhow::Context;
use forge_billing::BillingSettings;
use forge_tenant::License;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind: String,
    /// Externally visible URL of this deployment
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".into(),
            base_url: "http://localhost:3000".into(),
        }
    }
}

/// Stand-in infrastructure driver
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Simulated infrastructure delay for start and suspend
    pub delay_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { delay_ms: 500 }
    }
}

/// Instance type to seed the catalog with
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceTypeSeed {
    /// Unique name, referenced by team types
    pub name: String,
    /// Offered to teams
    #[serde(default = "default_true")]
    pub active: bool,
    /// Display order
    #[serde(default)]
    pub order: u32,
}

/// Availability and cap of one instance type
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceLimitSeed {
    /// Offered to the team
    #[serde(default)]
    pub active: bool,
    /// Cap; unbounded when absent
    #[serde(default)]
    pub limit: Option<u64>,
}

/// Trial offered by a team type
#[derive(Debug, Clone, Deserialize)]
pub struct TrialSeed {
    /// Instance type name; set for legacy trials
    #[serde(default)]
    pub instance_type: Option<String>,
    /// Length in days
    pub duration: u32,
}

/// Team type with instance types referenced by name
#[derive(Debug, Clone, Deserialize)]
pub struct TeamTypeSeed {
    /// Unique name
    pub name: String,
    /// Rank among team types
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub users: Option<u64>,
    /// Device cap; unbounded when absent
    #[serde(default)]
    pub devices: Option<u64>,
    /// Limits keyed by instance type name
    #[serde(default)]
    pub instances: BTreeMap<String, InstanceLimitSeed>,
    /// Trial for new teams
    #[serde(default)]
    pub trial: Option<TrialSeed>,
}

/// Instance types and team types created at startup
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Salt for external instance type ids
    pub salt: String,
    /// Seeded in order
    pub instance_types: Vec<InstanceTypeSeed>,
    /// Seeded in order, after the instance types they name
    pub team_types: Vec<TeamTypeSeed>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            salt: "forge".into(),
            instance_types: Vec::new(),
            team_types: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Forge configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    /// Listener settings
    pub server: ServerConfig,
    /// Billing gate and provider settings
    pub billing: BillingSettings,
    /// Installed license
    pub license: License,
    /// Initial feature flag values
    pub features: BTreeMap<String, bool>,
    /// Infrastructure driver settings
    pub driver: DriverConfig,
    /// Catalog seed
    pub catalog: CatalogConfig,
}

impl ForgeConfig {
    /// Parse a TOML document
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("invalid configuration")
    }

    /// Load from a file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// Load from a file, falling back to defaults when it is missing
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => {
                tracing::warn!(path = %path.display(), "Config not found, using defaults");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ForgeConfig::from_toml("").unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:3000");
        assert_eq!(config.billing.route_prefix, "/ee");
        assert!(!config.license.licensed);
        assert_eq!(config.license.teams, 5);
    }

    #[test]
    fn test_full_config() {
        let config = ForgeConfig::from_toml(
            r#"
            [billing]
            enabled = true
            new_customer_free_credit = 1000
            items.abc = { product = "prod_1", price = "price_1" }

            [license]
            licensed = true
            teams = 50

            [features]
            shared-library = false

            [[catalog.instance_types]]
            name = "small"

            [[catalog.team_types]]
            name = "starter"
            users = 2
            instances.small = { active = true, limit = 2 }
            trial = { instance_type = "small", duration = 14 }
            "#,
        )
        .unwrap();

        assert_eq!(config.billing.free_credit(), Some(1000));
        assert_eq!(config.billing.item_for("abc").unwrap().price, "price_1");
        assert_eq!(config.license.teams, 50);
        assert_eq!(config.features.get("shared-library"), Some(&false));
        assert!(config.catalog.instance_types[0].active);

        let starter = &config.catalog.team_types[0];
        assert_eq!(starter.users, Some(2));
        assert_eq!(starter.instances["small"].limit, Some(2));
        assert_eq!(starter.trial.as_ref().unwrap().instance_type.as_deref(), Some("small"));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = ForgeConfig::load_or_default(Some(Path::new("/nonexistent/forge.toml"))).unwrap();
        assert!(config.catalog.team_types.is_empty());
    }
}
