//! External billing provider
//!
//! The reconciler and the lifecycle gate only ever talk to the billing system
//! through [`BillingProvider`].

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Billing provider failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BillingProviderError {
    /// No such customer
    #[error("unknown customer: {0}")]
    UnknownCustomer(String),

    /// Provider unreachable or failing
    #[error("billing provider unavailable: {0}")]
    Unavailable(String),
}

/// Calls into the external billing system
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Credit (negative) or debit a customer's balance, in minor units
    async fn create_balance_transaction(
        &self,
        customer: &str,
        amount: i64,
        currency: &str,
    ) -> Result<(), BillingProviderError>;

    /// Change the quantity of a line item, returning the new quantity
    async fn adjust_item_quantity(
        &self,
        subscription: &str,
        item: &str,
        delta: i64,
    ) -> Result<u64, BillingProviderError>;
}

/// Recorded balance transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceTransaction {
    /// External customer id
    pub customer: String,
    /// Minor units; negative credits
    pub amount: i64,
    /// ISO currency code
    pub currency: String,
}

/// Recorded quantity change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuantityAdjustment {
    /// External subscription id
    pub subscription: String,
    /// Price id
    pub item: String,
    /// Quantity change
    pub delta: i64,
}

#[derive(Default)]
struct Ledger {
    transactions: Vec<BalanceTransaction>,
    adjustments: Vec<QuantityAdjustment>,
    quantities: HashMap<(String, String), u64>,
}

/// In-process billing provider keeping a ledger of every call
#[derive(Default)]
pub struct LedgerBillingProvider {
    ledger: RwLock<Ledger>,
}

impl LedgerBillingProvider {
    /// Empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Every balance transaction, oldest first
    pub fn transactions(&self) -> Vec<BalanceTransaction> {
        self.ledger.read().transactions.clone()
    }

    /// Every quantity change, oldest first
    pub fn adjustments(&self) -> Vec<QuantityAdjustment> {
        self.ledger.read().adjustments.clone()
    }

    /// Current quantity of a line item
    pub fn quantity(&self, subscription: &str, item: &str) -> u64 {
        self.ledger
            .read()
            .quantities
            .get(&(subscription.to_string(), item.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl BillingProvider for LedgerBillingProvider {
    async fn create_balance_transaction(
        &self,
        customer: &str,
        amount: i64,
        currency: &str,
    ) -> Result<(), BillingProviderError> {
        tracing::info!(customer, amount, currency, "balance transaction created");
        self.ledger.write().transactions.push(BalanceTransaction {
            customer: customer.to_string(),
            amount,
            currency: currency.to_string(),
        });
        Ok(())
    }

    async fn adjust_item_quantity(
        &self,
        subscription: &str,
        item: &str,
        delta: i64,
    ) -> Result<u64, BillingProviderError> {
        let mut ledger = self.ledger.write();
        ledger.adjustments.push(QuantityAdjustment {
            subscription: subscription.to_string(),
            item: item.to_string(),
            delta,
        });

        let quantity = ledger
            .quantities
            .entry((subscription.to_string(), item.to_string()))
            .or_insert(0);
        *quantity = quantity.saturating_add_signed(delta);

        tracing::info!(subscription, item, delta, quantity = *quantity, "item quantity adjusted");
        Ok(*quantity)
    }
}
