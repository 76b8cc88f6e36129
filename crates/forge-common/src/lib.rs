//! Forge Common - Shared types for the Forge control plane
//!
//! This crate provides the primitives every other crate builds on:
//! - Error taxonomy with HTTP status mapping
//! - Limits (bounded or unbounded) and structured limit violations
//! - Audit log records for billing and team changes
//! - Feature flag registry
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        FORGE CONTROL PLANE                              │
//! │                                                                         │
//! │  Billing webhook ─► Subscription Reconciler ─► Subscription + cascade   │
//! │                                                                         │
//! │  Resource action ─► Lifecycle Gate ─┬─► Entitlement Evaluator           │
//! │                                     │      (Policy Store + counts)      │
//! │                                     └─► Subscription / trial state      │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌─────────────┐ │
//! │  │  ForgeError  │  │  Violations  │  │  Audit Log   │  │  Features   │ │
//! │  └──────────────┘  └──────────────┘  └──────────────┘  └─────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod audit;
pub mod error;
pub mod features;
pub mod limit;
pub mod violation;

pub use audit::{AuditEntry, AuditLog, AuditUpdate, InMemoryAuditLog};
pub use error::{ForgeError, ForgeResult};
pub use features::FeatureRegistry;
pub use limit::Limit;
pub use violation::{Violation, ViolationCode, ViolationSet};

/// Team identifier
pub type TeamId = uuid::Uuid;

/// Billable resource identifier
pub type ResourceId = uuid::Uuid;
