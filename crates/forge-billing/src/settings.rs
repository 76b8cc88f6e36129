//! Billing settings

use serde::Deserialize;
use std::collections::BTreeMap;

/// Line item an instance type is billed against
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BillingItem {
    /// External product id
    pub product: String,
    /// External price id; quantities are adjusted on this item
    pub price: String,
}

/// Billing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BillingSettings {
    /// When false, resources are never gated on a subscription
    pub enabled: bool,
    /// Prefix the billing callback is mounted under
    pub route_prefix: String,
    /// Currency for balance transactions
    pub currency: String,
    /// Credit granted to new subscriptions flagged as free trials, in minor units
    pub new_customer_free_credit: Option<i64>,
    /// Billing items keyed by external instance type id
    pub items: BTreeMap<String, BillingItem>,
}

impl Default for BillingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            route_prefix: "/ee".into(),
            currency: "usd".into(),
            new_customer_free_credit: None,
            items: BTreeMap::new(),
        }
    }
}

impl BillingSettings {
    /// Configured free credit, ignoring zero
    pub fn free_credit(&self) -> Option<i64> {
        self.new_customer_free_credit.filter(|c| *c != 0)
    }

    /// Billing item for an instance type hashid
    pub fn item_for(&self, instance_type: &str) -> Option<&BillingItem> {
        self.items.get(instance_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings: BillingSettings = serde_json::from_str("{}").unwrap();
        assert!(settings.enabled);
        assert_eq!(settings.route_prefix, "/ee");
        assert_eq!(settings.currency, "usd");
        assert!(settings.free_credit().is_none());
    }

    #[test]
    fn test_zero_credit_is_unconfigured() {
        let settings = BillingSettings {
            new_customer_free_credit: Some(0),
            ..Default::default()
        };
        assert!(settings.free_credit().is_none());
    }
}
