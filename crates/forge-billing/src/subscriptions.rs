//! Subscription Management
//!
//! Local mirror of external billing subscriptions, one per team. Every
//! mutation re-reads the stored record under the write lock, so stale or
//! replayed events resolve to a no-op instead of a regression.

use chrono::{DateTime, Duration, Utc};
use forge_common::TeamId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Subscription status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid and current
    Active,
    /// Payment failed; resources keep running
    PastDue,
    /// Ended by the provider
    Canceled,
    /// Local only; never mapped from the external vocabulary
    Trial,
}

impl SubscriptionStatus {
    /// Map an external status; unrecognized values yield `None`
    pub fn from_external(status: &str) -> Option<Self> {
        match status {
            "active" => Some(Self::Active),
            "past_due" => Some(Self::PastDue),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }

    /// External vocabulary, `trial` for local trials
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Trial => "trial",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of a legacy trial
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialStatus {
    /// No trial resource yet
    #[default]
    None,
    /// The one trial resource has been created
    Created,
    /// The trial is over
    Ended,
}

/// Team subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Owning team
    pub team_id: TeamId,
    /// External customer id
    pub customer: Option<String>,
    /// External subscription id
    pub subscription: Option<String>,
    /// Current status
    pub status: SubscriptionStatus,
    /// End of the trial, if one was started
    pub trial_ends_at: Option<DateTime<Utc>>,
    /// Legacy trial progress
    pub trial_status: TrialStatus,
    /// Last local change
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Backed by an external subscription in good standing
    pub fn is_paid(&self) -> bool {
        matches!(self.status, SubscriptionStatus::Active | SubscriptionStatus::PastDue) && self.subscription.is_some()
    }

    /// Local trial, active or ended
    pub fn is_trial(&self) -> bool {
        self.status == SubscriptionStatus::Trial
    }

    /// Trial whose end date has passed
    pub fn is_trial_ended(&self, now: DateTime<Utc>) -> bool {
        self.is_trial() && self.trial_ends_at.map_or(true, |ends| ends <= now)
    }

    /// Trial still running
    pub fn is_trial_active(&self, now: DateTime<Utc>) -> bool {
        self.is_trial() && !self.is_trial_ended(now)
    }
}

/// Result of applying an external status change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// No subscription for the customer
    UnknownCustomer,
    /// Known customer, but the event names a different subscription
    SubscriptionMismatch {
        /// Team owning the customer
        team_id: TeamId,
    },
    /// Status was already current
    Unchanged {
        /// Team owning the subscription
        team_id: TeamId,
    },
    /// Status changed from `old` to `new`
    Applied {
        /// Team owning the subscription
        team_id: TeamId,
        /// Status before the event
        old: SubscriptionStatus,
        /// Status after the event
        new: SubscriptionStatus,
    },
}

/// In-memory subscription store
#[derive(Default)]
pub struct SubscriptionStore {
    subscriptions: RwLock<HashMap<TeamId, Subscription>>,
}

impl SubscriptionStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscription of a team
    pub fn for_team(&self, team_id: &TeamId) -> Option<Subscription> {
        self.subscriptions.read().get(team_id).cloned()
    }

    /// Subscription bound to an external customer
    pub fn by_customer(&self, customer: &str) -> Option<Subscription> {
        self.subscriptions
            .read()
            .values()
            .find(|s| s.customer.as_deref() == Some(customer))
            .cloned()
    }

    /// Bind the team to a paid external subscription, replacing any trial.
    ///
    /// A customer id moves with the newest checkout; no other team keeps it.
    pub fn upsert_paid(&self, team_id: TeamId, customer: &str, subscription: &str) -> Subscription {
        let mut subscriptions = self.subscriptions.write();
        for other in subscriptions.values_mut() {
            if other.team_id != team_id && other.customer.as_deref() == Some(customer) {
                other.customer = None;
            }
        }

        let record = Subscription {
            team_id,
            customer: Some(customer.to_string()),
            subscription: Some(subscription.to_string()),
            status: SubscriptionStatus::Active,
            trial_ends_at: None,
            trial_status: TrialStatus::None,
            updated_at: Utc::now(),
        };
        subscriptions.insert(team_id, record.clone());
        record
    }

    /// Start a trial ending `days` from now; a negative length yields an
    /// already-ended trial
    pub fn create_trial(&self, team_id: TeamId, days: i64) -> Subscription {
        let now = Utc::now();
        let record = Subscription {
            team_id,
            customer: None,
            subscription: None,
            status: SubscriptionStatus::Trial,
            trial_ends_at: Some(now + Duration::days(days)),
            trial_status: TrialStatus::None,
            updated_at: now,
        };
        self.subscriptions.write().insert(team_id, record.clone());
        record
    }

    /// Mark the legacy trial resource as created. False if it already was.
    pub fn claim_legacy_trial(&self, team_id: &TeamId) -> bool {
        let mut subscriptions = self.subscriptions.write();
        match subscriptions.get_mut(team_id) {
            Some(sub) if sub.is_trial() && sub.trial_status == TrialStatus::None => {
                sub.trial_status = TrialStatus::Created;
                sub.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }

    /// Undo a claim whose resource creation failed
    pub fn release_legacy_trial(&self, team_id: &TeamId) {
        if let Some(sub) = self.subscriptions.write().get_mut(team_id) {
            if sub.trial_status == TrialStatus::Created {
                sub.trial_status = TrialStatus::None;
            }
        }
    }

    /// Apply a status change for the subscription `subscription_id` of `customer`
    pub fn transition(&self, customer: &str, subscription_id: &str, status: SubscriptionStatus) -> Transition {
        let mut subscriptions = self.subscriptions.write();
        let Some(sub) = subscriptions
            .values_mut()
            .find(|s| s.customer.as_deref() == Some(customer))
        else {
            return Transition::UnknownCustomer;
        };

        if sub.subscription.as_deref() != Some(subscription_id) {
            return Transition::SubscriptionMismatch { team_id: sub.team_id };
        }
        if sub.status == status {
            return Transition::Unchanged { team_id: sub.team_id };
        }

        let old = std::mem::replace(&mut sub.status, status);
        sub.updated_at = Utc::now();
        Transition::Applied {
            team_id: sub.team_id,
            old,
            new: status,
        }
    }

    /// Number of subscriptions
    pub fn len(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// True when no team has a subscription
    pub fn is_empty(&self) -> bool {
        self.subscriptions.read().is_empty()
    }
}
