//! Billing webhook events
//!
//! The external billing system posts
//! `{id, object: "event", type, data: {object, previous_attributes?}}`.
//! Only the fields the reconciler reads are modelled; everything else is
//! ignored.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

/// Event types the reconciler acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// `charge.failed`
    ChargeFailed,
    /// `checkout.session.completed`
    CheckoutCompleted,
    /// `checkout.session.expired`
    CheckoutExpired,
    /// `customer.subscription.created`
    SubscriptionCreated,
    /// `customer.subscription.updated`
    SubscriptionUpdated,
    /// `customer.subscription.deleted`
    SubscriptionDeleted,
    /// Anything else, acknowledged and ignored
    Other(String),
}

impl EventKind {
    /// Unknown types become `Other`
    pub fn parse(kind: &str) -> Self {
        match kind {
            "charge.failed" => Self::ChargeFailed,
            "checkout.session.completed" => Self::CheckoutCompleted,
            "checkout.session.expired" => Self::CheckoutExpired,
            "customer.subscription.created" => Self::SubscriptionCreated,
            "customer.subscription.updated" => Self::SubscriptionUpdated,
            "customer.subscription.deleted" => Self::SubscriptionDeleted,
            other => Self::Other(other.to_string()),
        }
    }

    /// Wire name
    pub fn as_str(&self) -> &str {
        match self {
            Self::ChargeFailed => "charge.failed",
            Self::CheckoutCompleted => "checkout.session.completed",
            Self::CheckoutExpired => "checkout.session.expired",
            Self::SubscriptionCreated => "customer.subscription.created",
            Self::SubscriptionUpdated => "customer.subscription.updated",
            Self::SubscriptionDeleted => "customer.subscription.deleted",
            Self::Other(kind) => kind,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The object an event is about: a charge, checkout session or subscription
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventObject {
    /// External object id
    pub id: String,
    /// External customer id
    #[serde(default)]
    pub customer: Option<String>,
    /// Subscription created by a checkout session
    #[serde(default)]
    pub subscription: Option<String>,
    /// Team id attached to a checkout session
    #[serde(default)]
    pub client_reference_id: Option<String>,
    /// Subscription status, external vocabulary
    #[serde(default)]
    pub status: Option<String>,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl EventObject {
    /// Customer id, empty when absent
    pub fn customer(&self) -> &str {
        self.customer.as_deref().unwrap_or_default()
    }

    /// `free_trial` metadata, as a boolean or the string "true"
    pub fn free_trial(&self) -> bool {
        match self.metadata.get("free_trial") {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(flag)) => flag == "true",
            _ => false,
        }
    }
}

/// Event payload
#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    /// Object the event is about
    pub object: EventObject,
    /// Fields changed by an update event
    #[serde(default)]
    pub previous_attributes: Option<Value>,
}

/// Billing webhook event
#[derive(Debug, Clone, Deserialize)]
pub struct BillingEvent {
    /// Event id
    pub id: String,
    /// Event type as sent
    #[serde(rename = "type")]
    pub kind: String,
    /// Payload
    pub data: EventData,
}

impl BillingEvent {
    /// Parse a webhook body
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Parsed event type
    pub fn kind(&self) -> EventKind {
        EventKind::parse(&self.kind)
    }

    /// Object the event is about
    pub fn object(&self) -> &EventObject {
        &self.data.object
    }
}
