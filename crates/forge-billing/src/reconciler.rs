//! Subscription Reconciler
//!
//! Turns billing webhook events into local subscription state. Every handler
//! re-reads stored state before acting, so duplicate and out-of-order events
//! are no-ops. Nothing here fails towards the billing system: the outcome
//! only decides how loudly the event is logged.

use forge_common::{AuditEntry, AuditLog, AuditUpdate, TeamId};
use forge_tenant::TenantStore;
use std::sync::Arc;
use uuid::Uuid;

use crate::events::{BillingEvent, EventKind};
use crate::gate::LifecycleGate;
use crate::provider::BillingProvider;
use crate::settings::BillingSettings;
use crate::subscriptions::{Subscription, SubscriptionStatus, SubscriptionStore, Transition};

/// What handling an event amounted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Logged, nothing to change
    Acknowledged,
    /// Local state changed
    Applied,
    /// Recognised subscription, status already current
    Unchanged,
    /// Body was not an event
    Malformed,
    /// No subscription for the event's customer
    UnknownCustomer,
    /// Checkout names a team that does not exist
    UnknownTeam,
    /// Known customer, different subscription id
    UnknownSubscription,
    /// Subscription left behind by a deleted team
    OrphanedSubscription,
    /// Status outside the handled vocabulary
    UnhandledStatus(String),
    /// Free trial subscription without a configured credit
    TrialNotConfigured,
    /// Event type the reconciler does not act on
    Ignored,
}

enum Resolved {
    Team(Subscription),
    UnknownCustomer,
    Orphaned,
}

/// Applies billing webhook events to local subscriptions and resources
pub struct SubscriptionReconciler {
    subscriptions: Arc<SubscriptionStore>,
    tenants: Arc<TenantStore>,
    gate: Arc<LifecycleGate>,
    provider: Arc<dyn BillingProvider>,
    audit: Arc<dyn AuditLog>,
    settings: BillingSettings,
}

impl SubscriptionReconciler {
    /// Reconciler over the shared stores and gate
    pub fn new(
        subscriptions: Arc<SubscriptionStore>,
        tenants: Arc<TenantStore>,
        gate: Arc<LifecycleGate>,
        provider: Arc<dyn BillingProvider>,
        audit: Arc<dyn AuditLog>,
        settings: BillingSettings,
    ) -> Self {
        Self {
            subscriptions,
            tenants,
            gate,
            provider,
            audit,
            settings,
        }
    }

    /// Handle a raw webhook body
    pub async fn handle_payload(&self, body: &[u8]) -> ReconcileOutcome {
        match BillingEvent::parse(body) {
            Ok(event) => self.handle(&event).await,
            Err(err) => {
                tracing::error!(error = %err, "malformed billing event");
                ReconcileOutcome::Malformed
            }
        }
    }

    /// Dispatch a parsed event by type
    pub async fn handle(&self, event: &BillingEvent) -> ReconcileOutcome {
        let kind = event.kind();
        match kind {
            EventKind::ChargeFailed | EventKind::CheckoutExpired => self.log_only(event, &kind),
            EventKind::CheckoutCompleted => self.checkout_completed(event, &kind),
            EventKind::SubscriptionCreated => self.subscription_created(event, &kind).await,
            EventKind::SubscriptionUpdated => self.subscription_updated(event, &kind),
            EventKind::SubscriptionDeleted => self.subscription_deleted(event, &kind),
            EventKind::Other(_) => {
                tracing::debug!(event = %event.id, kind = %kind, "unhandled billing event");
                ReconcileOutcome::Ignored
            }
        }
    }

    fn received(event: &BillingEvent, kind: &EventKind) -> String {
        let object = event.object();
        format!("billing {} event {} from {} received", kind, object.id, object.customer())
    }

    /// Find the team behind the event's customer, logging the miss
    fn resolve(&self, event: &BillingEvent, kind: &EventKind) -> Result<Subscription, ReconcileOutcome> {
        let resolved = match self.subscriptions.by_customer(event.object().customer()) {
            None => Resolved::UnknownCustomer,
            Some(sub) if self.tenants.team(&sub.team_id).is_err() => Resolved::Orphaned,
            Some(sub) => Resolved::Team(sub),
        };

        let received = Self::received(event, kind);
        match resolved {
            Resolved::Team(sub) => Ok(sub),
            Resolved::UnknownCustomer => {
                tracing::error!(event = %event.id, "{} for unknown team by customer id", received);
                Err(ReconcileOutcome::UnknownCustomer)
            }
            Resolved::Orphaned => {
                tracing::warn!(event = %event.id, "{} for deleted team with orphaned subscription", received);
                Err(ReconcileOutcome::OrphanedSubscription)
            }
        }
    }

    /// Resolve and also require the event to name the stored subscription
    fn resolve_subscription(&self, event: &BillingEvent, kind: &EventKind) -> Result<Subscription, ReconcileOutcome> {
        let sub = self.resolve(event, kind)?;
        if sub.subscription.as_deref() != Some(event.object().id.as_str()) {
            tracing::warn!(
                event = %event.id,
                "{} for team '{}' for unknown subscription",
                Self::received(event, kind),
                sub.team_id
            );
            return Err(ReconcileOutcome::UnknownSubscription);
        }
        tracing::info!(event = %event.id, "{} for team '{}'", Self::received(event, kind), sub.team_id);
        Ok(sub)
    }

    fn log_only(&self, event: &BillingEvent, kind: &EventKind) -> ReconcileOutcome {
        match self.resolve(event, kind) {
            Ok(sub) => {
                tracing::info!(event = %event.id, "{} for team '{}'", Self::received(event, kind), sub.team_id);
                ReconcileOutcome::Acknowledged
            }
            Err(outcome) => outcome,
        }
    }

    fn checkout_completed(&self, event: &BillingEvent, kind: &EventKind) -> ReconcileOutcome {
        let object = event.object();
        let reference = object.client_reference_id.as_deref().unwrap_or_default();
        let team = Uuid::parse_str(reference)
            .ok()
            .and_then(|id| self.tenants.team(&id).ok());

        let Some(team) = team else {
            tracing::error!(
                event = %event.id,
                "{} for unknown team by team id '{}'",
                Self::received(event, kind),
                reference
            );
            return ReconcileOutcome::UnknownTeam;
        };
        tracing::info!(event = %event.id, "{} for team '{}'", Self::received(event, kind), team.id);

        let Some(subscription) = object.subscription.as_deref() else {
            tracing::warn!(event = %event.id, team = %team.id, "checkout completed without a subscription");
            return ReconcileOutcome::Ignored;
        };
        self.subscriptions.upsert_paid(team.id, object.customer(), subscription);
        tracing::info!(team = %team.id, customer = object.customer(), subscription, "subscription created");
        ReconcileOutcome::Applied
    }

    async fn subscription_created(&self, event: &BillingEvent, kind: &EventKind) -> ReconcileOutcome {
        let sub = match self.resolve_subscription(event, kind) {
            Ok(sub) => sub,
            Err(outcome) => return outcome,
        };
        let object = event.object();
        if !object.free_trial() {
            return ReconcileOutcome::Acknowledged;
        }

        let Some(credit) = self.settings.free_credit() else {
            tracing::error!(
                "Received a new subscription with the trial flag set for {}, but trials are not configured.",
                sub.team_id
            );
            return ReconcileOutcome::TrialNotConfigured;
        };

        let result = self
            .provider
            .create_balance_transaction(object.customer(), -credit, &self.settings.currency)
            .await;
        if let Err(err) = result {
            tracing::error!(team = %sub.team_id, error = %err, "failed to credit free trial balance");
        }
        ReconcileOutcome::Applied
    }

    fn subscription_updated(&self, event: &BillingEvent, kind: &EventKind) -> ReconcileOutcome {
        if let Err(outcome) = self.resolve_subscription(event, kind) {
            return outcome;
        }
        let object = event.object();
        let raw = object.status.as_deref().unwrap_or_default();

        let Some(status) = SubscriptionStatus::from_external(raw) else {
            tracing::warn!(
                "billing subscription {} has transitioned to a state not currently handled: '{}'",
                object.id,
                raw
            );
            return ReconcileOutcome::UnhandledStatus(raw.to_string());
        };
        self.apply(event, status).0
    }

    fn subscription_deleted(&self, event: &BillingEvent, kind: &EventKind) -> ReconcileOutcome {
        if let Err(outcome) = self.resolve_subscription(event, kind) {
            return outcome;
        }
        let (outcome, team_id) = self.apply(event, SubscriptionStatus::Canceled);
        if let Some(team_id) = team_id {
            self.gate.suspend_all(&team_id);
        }
        outcome
    }

    /// Persist a status change and audit it
    fn apply(&self, event: &BillingEvent, status: SubscriptionStatus) -> (ReconcileOutcome, Option<TeamId>) {
        let object = event.object();
        match self.subscriptions.transition(object.customer(), &object.id, status) {
            Transition::Applied { team_id, old, new } => {
                tracing::info!(team = %team_id, from = %old, to = %new, "subscription status changed");
                self.audit.record(AuditEntry::subscription_updated(
                    team_id,
                    vec![AuditUpdate::new("status", old.as_str(), new.as_str())],
                ));
                (ReconcileOutcome::Applied, Some(team_id))
            }
            Transition::Unchanged { team_id } => {
                tracing::warn!(team = %team_id, status = %status, event = %event.id, "subscription status unchanged");
                (ReconcileOutcome::Unchanged, Some(team_id))
            }
            Transition::SubscriptionMismatch { team_id } => {
                tracing::warn!(team = %team_id, event = %event.id, "subscription replaced while handling event");
                (ReconcileOutcome::UnknownSubscription, None)
            }
            Transition::UnknownCustomer => {
                tracing::error!(event = %event.id, "customer disappeared while handling event");
                (ReconcileOutcome::UnknownCustomer, None)
            }
        }
    }
}
