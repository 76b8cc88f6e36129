//! Resource Lifecycle Gate
//!
//! Create, start and suspend go through here. The local state change is the
//! system of record: it is committed first, then infrastructure and billing
//! side effects run on spawned tasks that can fail without undoing it.

use chrono::{DateTime, Utc};
use forge_common::{ForgeError, ForgeResult, ResourceId, TeamId};
use forge_tenant::{EntitlementEvaluator, InstanceTypeId, InstanceTypeRef, Resource, ResourceState};
use parking_lot::Mutex;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::driver::ResourceDriver;
use crate::inflight::{InflightRegistry, InflightState};
use crate::provider::BillingProvider;
use crate::settings::BillingSettings;
use crate::subscriptions::{SubscriptionStore, TrialStatus};

/// How a new resource is paid for
#[derive(Debug, Clone, PartialEq, Eq)]
enum BillingMode {
    Unbilled,
    Trial { legacy: bool },
    Paid { subscription: String },
}

/// Resource state after an action, including any transitional marker
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    /// Resource after the action
    #[serde(flatten)]
    pub resource: Resource,
    /// Set while the infrastructure action runs
    pub inflight: Option<InflightState>,
}

/// Gate in front of every resource lifecycle action
pub struct LifecycleGate {
    evaluator: Arc<EntitlementEvaluator>,
    subscriptions: Arc<SubscriptionStore>,
    provider: Arc<dyn BillingProvider>,
    driver: Arc<dyn ResourceDriver>,
    inflight: Arc<InflightRegistry>,
    settings: BillingSettings,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl LifecycleGate {
    /// Gate over shared stores; side effects run on spawned tasks
    pub fn new(
        evaluator: Arc<EntitlementEvaluator>,
        subscriptions: Arc<SubscriptionStore>,
        provider: Arc<dyn BillingProvider>,
        driver: Arc<dyn ResourceDriver>,
        settings: BillingSettings,
    ) -> Self {
        Self {
            evaluator,
            subscriptions,
            provider,
            driver,
            inflight: Arc::new(InflightRegistry::new()),
            settings,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Transitional markers of running actions
    pub fn inflight(&self) -> &InflightRegistry {
        &self.inflight
    }

    // ===== Billing decisions =====

    fn create_mode(&self, team_id: &TeamId, instance_type: InstanceTypeId, now: DateTime<Utc>) -> ForgeResult<BillingMode> {
        if !self.settings.enabled {
            return Ok(BillingMode::Unbilled);
        }
        let Some(sub) = self.subscriptions.for_team(team_id) else {
            return Err(ForgeError::billing_required("team billing is not set up"));
        };

        if sub.is_paid() {
            if let Some(subscription) = sub.subscription.clone() {
                return Ok(BillingMode::Paid { subscription });
            }
        }

        if sub.is_trial_active(now) {
            let policy = self.evaluator.team_policy(team_id)?;
            match policy.properties.active_trial() {
                Some(trial) if trial.is_legacy() => {
                    if trial.instance_type != Some(instance_type) {
                        return Err(ForgeError::billing_required(
                            "instance type is not available during the trial",
                        ));
                    }
                    if sub.trial_status != TrialStatus::None {
                        return Err(ForgeError::billing_required("trial instance already created"));
                    }
                    return Ok(BillingMode::Trial { legacy: true });
                }
                Some(_) => return Ok(BillingMode::Trial { legacy: false }),
                None => {}
            }
        }

        Err(ForgeError::billing_required("team subscription is not active"))
    }

    /// Paid subscription to bill a start against, or an error when the team
    /// may not start resources at all
    fn start_billing(&self, team_id: &TeamId, now: DateTime<Utc>) -> ForgeResult<Option<String>> {
        if !self.settings.enabled {
            return Ok(None);
        }
        match self.subscriptions.for_team(team_id) {
            Some(sub) if sub.is_paid() => Ok(sub.subscription),
            Some(sub) if sub.is_trial_active(now) => Ok(None),
            Some(sub) if sub.is_trial() => Err(ForgeError::PaymentRequired("trial has ended".into())),
            _ => Err(ForgeError::PaymentRequired("team has no active subscription".into())),
        }
    }

    fn paid_subscription(&self, team_id: &TeamId) -> Option<String> {
        if !self.settings.enabled {
            return None;
        }
        self.subscriptions
            .for_team(team_id)
            .filter(|s| s.is_paid())
            .and_then(|s| s.subscription)
    }

    // ===== Actions =====

    /// Create a resource if billing and policy limits allow it
    pub fn create_resource(
        &self,
        team_id: &TeamId,
        name: &str,
        instance_type: impl Into<InstanceTypeRef>,
    ) -> ForgeResult<ActionOutcome> {
        let instance_type = self.evaluator.catalog().resolve(&instance_type.into())?;
        let mode = self.create_mode(team_id, instance_type, Utc::now())?;

        let legacy = mode == BillingMode::Trial { legacy: true };
        if legacy && !self.subscriptions.claim_legacy_trial(team_id) {
            return Err(ForgeError::billing_required("trial instance already created"));
        }

        let resource = match self.evaluator.create_checked(Resource::new(*team_id, name, instance_type)) {
            Ok(resource) => resource,
            Err(err) => {
                if legacy {
                    self.subscriptions.release_legacy_trial(team_id);
                }
                return Err(err);
            }
        };
        tracing::info!(team = %team_id, resource = %resource.id, mode = ?mode, "resource created");

        self.begin(resource.clone(), InflightState::Starting);
        if let BillingMode::Paid { subscription } = mode {
            self.adjust_billing(subscription, instance_type, 1);
        }

        Ok(ActionOutcome {
            resource,
            inflight: Some(InflightState::Starting),
        })
    }

    /// Resume a resource. Policy limits never block this; a lapsed trial or
    /// missing subscription does.
    pub fn start(&self, resource_id: &ResourceId) -> ForgeResult<ActionOutcome> {
        let store = self.evaluator.store();
        let resource = store.resource(resource_id)?;
        let paid = self.start_billing(&resource.team_id, Utc::now())?;
        self.evaluator
            .check_instance_start_allowed(&resource.team_id, resource.instance_type)?;

        let previous = store.set_resource_state(resource_id, ResourceState::Running)?;
        let resource = Resource {
            state: ResourceState::Running,
            ..resource
        };
        tracing::info!(resource = %resource_id, from = %previous, "resource starting");

        self.begin(resource.clone(), InflightState::Starting);
        if let Some(subscription) = paid {
            if previous != ResourceState::Running {
                self.adjust_billing(subscription, resource.instance_type, 1);
            }
        }

        Ok(ActionOutcome {
            resource,
            inflight: Some(InflightState::Starting),
        })
    }

    /// Suspend a resource. A running paid resource gives back its billed quantity.
    pub fn suspend(&self, resource_id: &ResourceId) -> ForgeResult<ActionOutcome> {
        let store = self.evaluator.store();
        let resource = store.resource(resource_id)?;
        let previous = store.set_resource_state(resource_id, ResourceState::Suspended)?;
        let resource = Resource {
            state: ResourceState::Suspended,
            ..resource
        };
        tracing::info!(resource = %resource_id, from = %previous, "resource suspending");

        self.begin(resource.clone(), InflightState::Suspending);
        if previous == ResourceState::Running {
            if let Some(subscription) = self.paid_subscription(&resource.team_id) {
                self.adjust_billing(subscription, resource.instance_type, -1);
            }
        }

        Ok(ActionOutcome {
            resource,
            inflight: Some(InflightState::Suspending),
        })
    }

    /// Suspend every resource of a team, whatever its state. No billing calls.
    pub fn suspend_all(&self, team_id: &TeamId) -> Vec<ResourceId> {
        let store = self.evaluator.store();
        let suspended: Vec<ResourceId> = store
            .suspend_team_resources(team_id)
            .into_iter()
            .map(|(id, _)| id)
            .collect();

        for id in &suspended {
            if let Ok(resource) = store.resource(id) {
                self.begin(resource, InflightState::Suspending);
            }
        }
        tracing::info!(team = %team_id, count = suspended.len(), "team resources suspended");
        suspended
    }

    /// Destroy a resource, releasing its slot and its billed quantity
    pub fn destroy(&self, resource_id: &ResourceId) -> ForgeResult<Resource> {
        let resource = self.evaluator.store().remove_resource(resource_id)?;
        self.inflight.remove(resource_id);

        if resource.state == ResourceState::Running {
            if let Some(subscription) = self.paid_subscription(&resource.team_id) {
                self.adjust_billing(subscription, resource.instance_type, -1);
            }
        }
        tracing::info!(team = %resource.team_id, resource = %resource_id, "resource destroyed");
        Ok(resource)
    }

    /// Resource with its current marker
    pub fn status(&self, resource_id: &ResourceId) -> ForgeResult<ActionOutcome> {
        let resource = self.evaluator.store().resource(resource_id)?;
        Ok(ActionOutcome {
            inflight: self.inflight.get(resource_id),
            resource,
        })
    }

    /// Wait for every outstanding side effect, including ones spawned while waiting
    pub async fn settle(&self) {
        loop {
            let pending = std::mem::take(&mut *self.tasks.lock());
            if pending.is_empty() {
                break;
            }
            for handle in pending {
                if let Err(err) = handle.await {
                    tracing::warn!(error = %err, "side effect task failed");
                }
            }
        }
    }

    // ===== Side effects =====

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        let mut tasks = self.tasks.lock();
        tasks.retain(|h| !h.is_finished());
        tasks.push(handle);
    }

    fn begin(&self, resource: Resource, state: InflightState) {
        let generation = self.inflight.set(resource.id, state);
        let driver = self.driver.clone();
        let inflight = self.inflight.clone();

        self.spawn(async move {
            let result = match state {
                InflightState::Starting => driver.start(&resource).await,
                InflightState::Suspending => driver.suspend(&resource).await,
            };
            if let Err(err) = result {
                tracing::warn!(resource = %resource.id, error = %err, "infrastructure action failed");
            }
            inflight.clear(&resource.id, generation);
        });
    }

    fn adjust_billing(&self, subscription: String, instance_type: InstanceTypeId, delta: i64) {
        let hashid = self.evaluator.catalog().hashid(instance_type);
        let Some(item) = self.settings.item_for(&hashid).map(|i| i.price.clone()) else {
            tracing::warn!(instance_type = %hashid, "no billing item configured for instance type");
            return;
        };

        let provider = self.provider.clone();
        self.spawn(async move {
            if let Err(err) = provider.adjust_item_quantity(&subscription, &item, delta).await {
                tracing::warn!(subscription = %subscription, item = %item, delta, error = %err, "billing quantity adjustment failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DriverError, LocalDriver};
    use crate::provider::{BillingProviderError, LedgerBillingProvider};
    use crate::settings::BillingItem;
    use async_trait::async_trait;
    use forge_tenant::{
        InstanceType, InstanceTypeCatalog, PolicyStore, Team, TeamTypeProperties, TenantStore, TrialPolicy,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio::task::JoinSet;
    use tokio_test::{assert_err, assert_ok};

    struct Fixture {
        gate: Arc<LifecycleGate>,
        subscriptions: Arc<SubscriptionStore>,
        provider: Arc<LedgerBillingProvider>,
        policies: Arc<PolicyStore>,
        store: Arc<TenantStore>,
        pt1: InstanceType,
        pt2: InstanceType,
    }

    fn fixture(enabled: bool) -> Fixture {
        fixture_with(enabled, Arc::new(LocalDriver::new(Duration::from_millis(10))), None)
    }

    /// `billing` replaces the ledger as the gate's provider; the ledger stays
    /// in the fixture so tests can assert it was never touched
    fn fixture_with(
        enabled: bool,
        driver: Arc<dyn ResourceDriver>,
        billing: Option<Arc<dyn BillingProvider>>,
    ) -> Fixture {
        let catalog = Arc::new(InstanceTypeCatalog::new("test"));
        let policies = Arc::new(PolicyStore::new());
        let store = Arc::new(TenantStore::new());
        let subscriptions = Arc::new(SubscriptionStore::new());
        let provider = Arc::new(LedgerBillingProvider::new());

        let pt1 = catalog.create("pt1", true, 1);
        let pt2 = catalog.create("pt2", true, 2);

        let mut settings = BillingSettings {
            enabled,
            ..Default::default()
        };
        for ty in [&pt1, &pt2] {
            settings.items.insert(
                ty.hashid.clone(),
                BillingItem {
                    product: format!("prod_{}", ty.name),
                    price: format!("price_{}", ty.name),
                },
            );
        }

        let evaluator = Arc::new(EntitlementEvaluator::new(catalog, policies.clone(), store.clone()));
        let billing = billing.unwrap_or_else(|| provider.clone() as Arc<dyn BillingProvider>);
        let gate = Arc::new(LifecycleGate::new(evaluator, subscriptions.clone(), billing, driver, settings));

        Fixture {
            gate,
            subscriptions,
            provider,
            policies,
            store,
            pt1,
            pt2,
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl BillingProvider for FailingProvider {
        async fn create_balance_transaction(&self, _: &str, _: i64, _: &str) -> Result<(), BillingProviderError> {
            Err(BillingProviderError::Unavailable("connection refused".into()))
        }

        async fn adjust_item_quantity(&self, _: &str, _: &str, _: i64) -> Result<u64, BillingProviderError> {
            Err(BillingProviderError::Unavailable("connection refused".into()))
        }
    }

    struct FailingDriver;

    impl FailingDriver {
        fn fail(resource: &Resource) -> Result<(), DriverError> {
            Err(DriverError::Failed {
                resource: resource.id.to_string(),
                message: "host unreachable".into(),
            })
        }
    }

    #[async_trait]
    impl ResourceDriver for FailingDriver {
        async fn start(&self, resource: &Resource) -> Result<(), DriverError> {
            Self::fail(resource)
        }

        async fn suspend(&self, resource: &Resource) -> Result<(), DriverError> {
            Self::fail(resource)
        }
    }

    /// Driver whose calls finish only when the test releases them, in any order
    #[derive(Default)]
    struct HeldDriver {
        pending: Mutex<Vec<Option<oneshot::Sender<()>>>>,
        finished: AtomicUsize,
    }

    impl HeldDriver {
        async fn hold(&self) -> Result<(), DriverError> {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().push(Some(tx));
            let _ = rx.await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn calls(&self) -> usize {
            self.pending.lock().len()
        }

        fn finished(&self) -> usize {
            self.finished.load(Ordering::SeqCst)
        }

        fn release(&self, call: usize) {
            if let Some(tx) = self.pending.lock()[call].take() {
                let _ = tx.send(());
            }
        }
    }

    #[async_trait]
    impl ResourceDriver for HeldDriver {
        async fn start(&self, _: &Resource) -> Result<(), DriverError> {
            self.hold().await
        }

        async fn suspend(&self, _: &Resource) -> Result<(), DriverError> {
            self.hold().await
        }
    }

    async fn wait_until(condition: impl Fn() -> bool) {
        for _ in 0..1000 {
            if condition() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition never held");
    }

    impl Fixture {
        fn team(&self, trial: Option<TrialPolicy>) -> Team {
            let mut properties = TeamTypeProperties::default()
                .with_instance(self.pt1.id, true, Some(2))
                .with_instance(self.pt2.id, true, None);
            if let Some(trial) = trial {
                properties = properties.with_trial(trial);
            }
            let team_type = self.policies.create("type", 1, properties);
            self.store
                .insert_team_checked(Team::new("team", team_type.id), |_| Ok(()))
                .unwrap()
        }

        fn paid_team(&self) -> Team {
            let team = self.team(None);
            self.subscriptions.upsert_paid(team.id, "cus_1", "sub_1");
            team
        }

        fn legacy_trial(&self) -> TrialPolicy {
            TrialPolicy {
                active: true,
                instance_type: Some(self.pt1.id),
                duration: 5,
            }
        }

        fn full_trial(&self) -> TrialPolicy {
            TrialPolicy {
                active: true,
                instance_type: None,
                duration: 5,
            }
        }
    }

    #[tokio::test]
    async fn test_create_requires_billing() {
        let f = fixture(true);
        let team = f.team(None);

        let err = f.gate.create_resource(&team.id, "p1", &f.pt1).unwrap_err();
        assert_eq!(err.http_status(), 400);
        assert_eq!(err.code(), "billing_required");
        assert!(f.store.team_resources(&team.id).is_empty());
    }

    #[tokio::test]
    async fn test_billing_disabled_skips_gate() {
        let f = fixture(false);
        let team = f.team(None);

        assert_ok!(f.gate.create_resource(&team.id, "p1", &f.pt1));
        f.gate.settle().await;
        assert!(f.provider.adjustments().is_empty());
    }

    #[tokio::test]
    async fn test_paid_create_marks_starting_until_driver_completes() {
        let f = fixture(true);
        let team = f.paid_team();

        let outcome = f.gate.create_resource(&team.id, "p1", f.pt1.hashid.as_str()).unwrap();
        assert_eq!(outcome.inflight, Some(InflightState::Starting));
        assert_eq!(f.gate.status(&outcome.resource.id).unwrap().inflight, Some(InflightState::Starting));

        f.gate.settle().await;
        assert_eq!(f.gate.status(&outcome.resource.id).unwrap().inflight, None);
        assert_eq!(f.provider.quantity("sub_1", "price_pt1"), 1);
    }

    #[tokio::test]
    async fn test_paid_suspend_and_resume_adjust_quantity() {
        let f = fixture(true);
        let team = f.paid_team();
        let id = f.gate.create_resource(&team.id, "p1", &f.pt1).unwrap().resource.id;
        f.gate.settle().await;

        let suspended = f.gate.suspend(&id).unwrap();
        assert_eq!(suspended.resource.state, ResourceState::Suspended);
        assert_eq!(suspended.inflight, Some(InflightState::Suspending));
        f.gate.settle().await;
        assert_eq!(f.provider.quantity("sub_1", "price_pt1"), 0);

        let started = f.gate.start(&id).unwrap();
        assert_eq!(started.resource.state, ResourceState::Running);
        f.gate.settle().await;
        assert_eq!(f.provider.quantity("sub_1", "price_pt1"), 1);

        // already running: no second increment
        f.gate.start(&id).unwrap();
        f.gate.settle().await;
        let deltas: Vec<i64> = f.provider.adjustments().iter().map(|a| a.delta).collect();
        assert_eq!(deltas, vec![1, -1, 1]);
    }

    #[tokio::test]
    async fn test_limit_rejection_is_not_billed() {
        let f = fixture(true);
        let team = f.paid_team();
        assert_ok!(f.gate.create_resource(&team.id, "p1", &f.pt1));
        assert_ok!(f.gate.create_resource(&team.id, "p2", &f.pt1));

        let err = f.gate.create_resource(&team.id, "p3", &f.pt1).unwrap_err();
        assert_eq!(err.code(), "instance_limit_reached");
        f.gate.settle().await;
        assert_eq!(f.provider.adjustments().len(), 2);
    }

    #[tokio::test]
    async fn test_legacy_trial_allows_one_designated_instance() {
        let f = fixture(true);
        let team = f.team(Some(f.legacy_trial()));
        f.subscriptions.create_trial(team.id, 5);

        let err = f.gate.create_resource(&team.id, "p1", &f.pt2).unwrap_err();
        assert_eq!(err.code(), "billing_required");

        assert_ok!(f.gate.create_resource(&team.id, "p1", &f.pt1));
        let err = f.gate.create_resource(&team.id, "p2", &f.pt1).unwrap_err();
        assert_eq!(err.code(), "billing_required");

        f.gate.settle().await;
        assert!(f.provider.adjustments().is_empty());
    }

    #[tokio::test]
    async fn test_full_trial_allows_many() {
        let f = fixture(true);
        let team = f.team(Some(f.full_trial()));
        f.subscriptions.create_trial(team.id, 5);

        assert_ok!(f.gate.create_resource(&team.id, "p1", &f.pt1));
        assert_ok!(f.gate.create_resource(&team.id, "p2", &f.pt1));
        assert_ok!(f.gate.create_resource(&team.id, "p3", &f.pt2));
    }

    #[tokio::test]
    async fn test_trial_suspend_resume_without_billing() {
        let f = fixture(true);
        let team = f.team(Some(f.full_trial()));
        f.subscriptions.create_trial(team.id, 5);
        let id = f.gate.create_resource(&team.id, "p1", &f.pt1).unwrap().resource.id;

        assert_ok!(f.gate.suspend(&id));
        let started = f.gate.start(&id).unwrap();
        assert_eq!(started.resource.state, ResourceState::Running);
        assert_eq!(started.inflight, Some(InflightState::Starting));

        f.gate.settle().await;
        assert!(f.provider.adjustments().is_empty());
        assert!(f.gate.inflight().is_empty());
    }

    #[tokio::test]
    async fn test_expired_trial_blocks_create_and_resume() {
        let f = fixture(true);
        let team = f.team(Some(f.full_trial()));
        f.subscriptions.create_trial(team.id, 5);
        let id = f.gate.create_resource(&team.id, "p1", &f.pt1).unwrap().resource.id;
        assert_ok!(f.gate.suspend(&id));

        f.subscriptions.create_trial(team.id, -1);

        let err = f.gate.create_resource(&team.id, "p2", &f.pt1).unwrap_err();
        assert_eq!(err.http_status(), 400);
        assert_eq!(err.code(), "billing_required");

        let err = assert_err!(f.gate.start(&id));
        assert_eq!(err.http_status(), 402);
        assert_eq!(f.gate.status(&id).unwrap().resource.state, ResourceState::Suspended);
    }

    #[tokio::test]
    async fn test_suspend_all_is_unbilled() {
        let f = fixture(true);
        let team = f.paid_team();
        let a = f.gate.create_resource(&team.id, "p1", &f.pt1).unwrap().resource.id;
        let b = f.gate.create_resource(&team.id, "p2", &f.pt2).unwrap().resource.id;
        f.gate.suspend(&b).unwrap();
        f.gate.settle().await;
        let before = f.provider.adjustments().len();

        let suspended = f.gate.suspend_all(&team.id);
        assert_eq!(suspended.len(), 2);
        assert!(suspended.contains(&a) && suspended.contains(&b));
        f.gate.settle().await;

        assert_eq!(f.provider.adjustments().len(), before);
        assert!(f
            .store
            .team_resources(&team.id)
            .iter()
            .all(|r| r.state == ResourceState::Suspended));
    }

    #[tokio::test]
    async fn test_destroy_releases_quantity() {
        let f = fixture(true);
        let team = f.paid_team();
        let id = f.gate.create_resource(&team.id, "p1", &f.pt2).unwrap().resource.id;
        f.gate.settle().await;

        assert_ok!(f.gate.destroy(&id));
        f.gate.settle().await;
        assert_eq!(f.provider.quantity("sub_1", "price_pt2"), 0);
        assert!(f.gate.status(&id).is_err());
    }

    #[tokio::test]
    async fn test_stale_driver_completion_keeps_newer_marker() {
        let driver = Arc::new(HeldDriver::default());
        let f = fixture_with(false, driver.clone(), None);
        let team = f.team(None);

        let id = f.gate.create_resource(&team.id, "p1", &f.pt1).unwrap().resource.id;
        wait_until(|| driver.calls() == 1).await;
        assert_ok!(f.gate.suspend(&id));
        wait_until(|| driver.calls() == 2).await;
        assert_ok!(f.gate.start(&id));
        wait_until(|| driver.calls() == 3).await;

        // create's start and the suspend finish after the second start began
        driver.release(0);
        driver.release(1);
        wait_until(|| driver.finished() == 2).await;
        assert_eq!(f.gate.status(&id).unwrap().inflight, Some(InflightState::Starting));

        driver.release(2);
        f.gate.settle().await;
        assert_eq!(f.gate.status(&id).unwrap().inflight, None);
        assert!(f.gate.inflight().is_empty());
    }

    #[tokio::test]
    async fn test_billing_failure_keeps_local_state() {
        let f = fixture_with(
            true,
            Arc::new(LocalDriver::new(Duration::from_millis(10))),
            Some(Arc::new(FailingProvider)),
        );
        let team = f.paid_team();

        let id = f.gate.create_resource(&team.id, "p1", &f.pt1).unwrap().resource.id;
        f.gate.settle().await;
        assert_eq!(f.gate.status(&id).unwrap().resource.state, ResourceState::Running);

        let suspended = assert_ok!(f.gate.suspend(&id));
        assert_eq!(suspended.resource.state, ResourceState::Suspended);
        f.gate.settle().await;

        assert_eq!(f.store.resource(&id).unwrap().state, ResourceState::Suspended);
        assert!(f.gate.inflight().is_empty());
        assert!(f.provider.adjustments().is_empty());
    }

    #[tokio::test]
    async fn test_driver_failure_keeps_local_state() {
        let f = fixture_with(true, Arc::new(FailingDriver), None);
        let team = f.paid_team();

        let id = f.gate.create_resource(&team.id, "p1", &f.pt1).unwrap().resource.id;
        f.gate.settle().await;
        assert_eq!(f.store.resource(&id).unwrap().state, ResourceState::Running);
        assert_eq!(f.gate.status(&id).unwrap().inflight, None);
        assert_eq!(f.provider.quantity("sub_1", "price_pt1"), 1);

        assert_ok!(f.gate.suspend(&id));
        f.gate.settle().await;
        assert_eq!(f.store.resource(&id).unwrap().state, ResourceState::Suspended);
        assert!(f.gate.inflight().is_empty());
        assert_eq!(f.provider.quantity("sub_1", "price_pt1"), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_respect_limit() {
        let f = fixture(true);
        let team = f.paid_team();

        let mut creates = JoinSet::new();
        for i in 0..8 {
            let gate = f.gate.clone();
            let team_id = team.id;
            let instance_type = f.pt1.id;
            creates.spawn(async move { gate.create_resource(&team_id, &format!("p{}", i), instance_type).is_ok() });
        }

        let mut created = 0;
        while let Some(result) = creates.join_next().await {
            if result.unwrap() {
                created += 1;
            }
        }

        assert_eq!(created, 2);
        assert_eq!(f.store.team_resources(&team.id).len(), 2);
        f.gate.settle().await;
        assert_eq!(f.provider.quantity("sub_1", "price_pt1"), 2);
    }
}
