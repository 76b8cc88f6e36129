//! Forge Billing - subscription reconciliation and lifecycle gating
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              FORGE BILLING                              │
//! │                                                                         │
//! │  webhook body ──► BillingEvent ──► SUBSCRIPTION RECONCILER              │
//! │                                      │  re-read, transition, audit      │
//! │                                      ├──► SubscriptionStore              │
//! │                                      ├──► BillingProvider (credits)      │
//! │                                      └──► LifecycleGate::suspend_all     │
//! │                                                                         │
//! │  resource action ──► LIFECYCLE GATE                                     │
//! │                        │  subscription / trial mode                     │
//! │                        ├──► EntitlementEvaluator (limits)               │
//! │                        ├──► InflightRegistry (starting / suspending)    │
//! │                        └──► spawned: ResourceDriver, item quantities    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod driver;
pub mod events;
pub mod gate;
pub mod inflight;
pub mod provider;
pub mod reconciler;
pub mod settings;
pub mod subscriptions;

pub use driver::{DriverError, LocalDriver, ResourceDriver};
pub use events::{BillingEvent, EventKind};
pub use gate::{ActionOutcome, LifecycleGate};
pub use inflight::{InflightRegistry, InflightState};
pub use provider::{BillingProvider, BillingProviderError, LedgerBillingProvider};
pub use reconciler::{ReconcileOutcome, SubscriptionReconciler};
pub use settings::{BillingItem, BillingSettings};
pub use subscriptions::{Subscription, SubscriptionStatus, SubscriptionStore, TrialStatus};
