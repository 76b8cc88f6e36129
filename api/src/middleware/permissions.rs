//! Role-based permissions
//!
//! Authentication happens upstream; the gateway forwards the caller's role
//! in the `x-forge-role` header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ApiError;

/// Header carrying the caller's role
pub const ROLE_HEADER: &str = "x-forge-role";

/// Caller role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Deployment administrator
    Admin,
    /// Team owner
    Owner,
    /// Team member
    Member,
    /// Read-only team member
    Viewer,
}

impl Role {
    /// Case-insensitive; unknown roles yield `None`
    pub fn parse(role: &str) -> Option<Self> {
        match role.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "owner" => Some(Self::Owner),
            "member" => Some(Self::Member),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }
}

/// Permission enum for fine-grained access control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// `flow-blueprint:create`
    FlowBlueprintCreate,
    /// `flow-blueprint:list`
    FlowBlueprintList,
    /// `flow-blueprint:read`
    FlowBlueprintRead,
    /// `flow-blueprint:edit`
    FlowBlueprintEdit,
    /// `flow-blueprint:delete`
    FlowBlueprintDelete,
}

impl Permission {
    /// Scope name, e.g. `flow-blueprint:create`
    pub fn scope(&self) -> &'static str {
        match self {
            Self::FlowBlueprintCreate => "flow-blueprint:create",
            Self::FlowBlueprintList => "flow-blueprint:list",
            Self::FlowBlueprintRead => "flow-blueprint:read",
            Self::FlowBlueprintEdit => "flow-blueprint:edit",
            Self::FlowBlueprintDelete => "flow-blueprint:delete",
        }
    }

    /// Get all permissions for a role
    pub fn for_role(role: Role) -> HashSet<Permission> {
        match role {
            Role::Admin => Self::all(),
            Role::Owner | Role::Member | Role::Viewer => Self::member(),
        }
    }

    fn all() -> HashSet<Permission> {
        use Permission::*;
        [
            FlowBlueprintCreate,
            FlowBlueprintList,
            FlowBlueprintRead,
            FlowBlueprintEdit,
            FlowBlueprintDelete,
        ]
        .into_iter()
        .collect()
    }

    fn member() -> HashSet<Permission> {
        use Permission::*;
        [FlowBlueprintList, FlowBlueprintRead].into_iter().collect()
    }
}

/// Caller identity as forwarded by the gateway
#[derive(Debug, Clone, Copy, Default)]
pub struct Caller {
    /// Missing or unrecognized role is `None`
    pub role: Option<Role>,
}

impl Caller {
    /// Whether the caller's role grants `required`
    pub fn has_permission(&self, required: Permission) -> bool {
        self.role
            .map(|role| Permission::for_role(role).contains(&required))
            .unwrap_or(false)
    }

    /// `Forbidden` unless the caller holds `required`
    pub fn require(&self, required: Permission) -> Result<(), ApiError> {
        if self.has_permission(required) {
            Ok(())
        } else {
            tracing::info!(role = ?self.role, scope = required.scope(), "permission denied");
            Err(ApiError::Forbidden)
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let role = parts
            .headers
            .get(ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(Role::parse);
        Ok(Self { role })
    }
}
