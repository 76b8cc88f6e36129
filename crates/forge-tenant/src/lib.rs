//! Forge Tenant - teams, team types and entitlements
//!
//! Decides whether a team may create, start or keep resources given its team
//! type and live counts, and what breaks when a team moves to another type.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         TENANT & ENTITLEMENTS                           │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                        TEAM REGISTRY                             │  │
//! │  │     create (license cap) │ delete (cascade) │ change type         │  │
//! │  └───────────────┬──────────────────────────────────┬───────────────┘  │
//! │                  │                                  │                  │
//! │  ┌───────────────▼──────────────┐   ┌───────────────▼───────────────┐  │
//! │  │    ENTITLEMENT EVALUATOR     │   │         POLICY STORE          │  │
//! │  │  limits │ counts │ violations│◄──│  team types, Arc snapshots    │  │
//! │  └───────────────┬──────────────┘   └───────────────────────────────┘  │
//! │                  │                                                     │
//! │  ┌───────────────▼──────────────┐   ┌───────────────────────────────┐  │
//! │  │         TENANT STORE         │   │     INSTANCE TYPE CATALOG     │  │
//! │  │ teams │ members │ devices │  │   │   id │ hashid │ object refs   │  │
//! │  │ resources (one lock)         │   └───────────────────────────────┘  │
//! │  └──────────────────────────────┘                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod blueprints;
pub mod catalog;
pub mod entitlements;
pub mod model;
pub mod policy;
pub mod registry;
pub mod store;

pub use blueprints::{
    BlueprintFilter, BlueprintPage, FlowBlueprint, FlowBlueprintStore, FlowBlueprintUpdate, NewFlowBlueprint,
    Pagination,
};
pub use catalog::{InstanceTypeCatalog, InstanceTypeRef};
pub use entitlements::EntitlementEvaluator;
pub use model::{
    Device, InstanceType, InstanceTypeId, Member, Resource, ResourceState, Team, TeamRole, TeamType, TeamTypeId,
    TeamTypeProperties, TrialPolicy,
};
pub use policy::PolicyStore;
pub use registry::{License, TeamRegistry};
pub use store::{TeamUsage, TenantStore};
