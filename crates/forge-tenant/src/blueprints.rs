//! Flow Blueprints
//!
//! Admin-curated templates that new resources can be seeded from.

use chrono::{DateTime, Utc};
use forge_common::{ForgeError, ForgeResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

const MAX_NAME_LEN: usize = 255;

/// Default and maximum page size
pub const DEFAULT_PAGE_LIMIT: usize = 30;

/// Full blueprint, including its flows and modules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowBlueprint {
    /// Blueprint id
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Grouping shown in the editor
    pub category: String,
    /// Inactive blueprints are hidden from the default listing
    pub active: bool,
    /// Flow definitions, always an object
    pub flows: Value,
    /// Module configuration, always an object
    pub modules: Value,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update
    pub updated_at: DateTime<Utc>,
}

/// Blueprint as listed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowBlueprintSummary {
    /// Blueprint id
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Grouping shown in the editor
    pub category: String,
    /// Whether the default listing shows it
    pub active: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update
    pub updated_at: DateTime<Utc>,
}

impl From<&FlowBlueprint> for FlowBlueprintSummary {
    fn from(b: &FlowBlueprint) -> Self {
        Self {
            id: b.id,
            name: b.name.clone(),
            description: b.description.clone(),
            category: b.category.clone(),
            active: b.active,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

/// Fields accepted on create
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewFlowBlueprint {
    /// Required, non-empty
    pub name: String,
    /// Defaults to empty
    #[serde(default)]
    pub description: Option<String>,
    /// Defaults to empty
    #[serde(default)]
    pub category: Option<String>,
    /// Defaults to active
    #[serde(default)]
    pub active: Option<bool>,
    /// Defaults to `{"flows": []}`
    #[serde(default)]
    pub flows: Option<Value>,
    /// Defaults to `{}`
    #[serde(default)]
    pub modules: Option<Value>,
}

/// Fields accepted on update; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlowBlueprintUpdate {
    /// Non-empty when given
    #[serde(default)]
    pub name: Option<String>,
    /// New description
    #[serde(default)]
    pub description: Option<String>,
    /// New category
    #[serde(default)]
    pub category: Option<String>,
    /// Show or hide in the default listing
    #[serde(default)]
    pub active: Option<bool>,
    /// Replaces the stored flows
    #[serde(default)]
    pub flows: Option<Value>,
    /// Replaces the stored modules
    #[serde(default)]
    pub modules: Option<Value>,
}

/// Which blueprints a listing returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlueprintFilter {
    /// Active only
    #[default]
    Active,
    /// Inactive only
    Inactive,
    /// Everything
    All,
}

impl BlueprintFilter {
    /// Filter named by a query value; anything unrecognized lists active ones
    pub fn from_query(value: &str) -> Self {
        match value {
            "inactive" => Self::Inactive,
            "all" => Self::All,
            _ => Self::Active,
        }
    }

    fn matches(&self, blueprint: &FlowBlueprint) -> bool {
        match self {
            Self::Active => blueprint.active,
            Self::Inactive => !blueprint.active,
            Self::All => true,
        }
    }
}

/// Cursor pagination; the cursor is the id of the last item seen
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    /// Id of the last blueprint on the previous page
    #[serde(default)]
    pub cursor: Option<Uuid>,
    /// Page size, capped at the default
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Listing metadata
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// Cursor of the next page, absent on the last one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Uuid>,
}

/// One page of blueprints
#[derive(Debug, Clone, Serialize)]
pub struct BlueprintPage {
    /// Paging metadata
    pub meta: PageMeta,
    /// Total matching the filter
    pub count: usize,
    /// Summaries, without flows or modules
    pub blueprints: Vec<FlowBlueprintSummary>,
}

fn validate_name(name: &str, errors: &mut Vec<String>) {
    if name.trim().is_empty() {
        errors.push("name must not be empty".to_string());
    } else if name.len() > MAX_NAME_LEN {
        errors.push(format!("name must be at most {} characters", MAX_NAME_LEN));
    }
}

fn validate_object(field: &str, value: &Value, errors: &mut Vec<String>) {
    if !value.is_object() {
        errors.push(format!("{} must be an object", field));
    }
}

fn validation_result(errors: Vec<String>) -> ForgeResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ForgeError::persistence(&errors, "Validation error"))
    }
}

/// In-memory blueprint store
#[derive(Default)]
pub struct FlowBlueprintStore {
    blueprints: RwLock<HashMap<Uuid, FlowBlueprint>>,
}

impl FlowBlueprintStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// One page of blueprints matching `filter`, in creation order
    pub fn list(&self, filter: BlueprintFilter, pagination: Pagination) -> BlueprintPage {
        let blueprints = self.blueprints.read();
        let mut matching: Vec<&FlowBlueprint> = blueprints.values().filter(|b| filter.matches(b)).collect();
        matching.sort_by_key(|b| (b.created_at, b.id));

        let limit = pagination
            .limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, DEFAULT_PAGE_LIMIT);
        let start = pagination
            .cursor
            .and_then(|cursor| matching.iter().position(|b| b.id == cursor))
            .map(|i| i + 1)
            .unwrap_or(0);

        let page: Vec<FlowBlueprintSummary> = matching
            .iter()
            .skip(start)
            .take(limit)
            .map(|b| FlowBlueprintSummary::from(*b))
            .collect();
        let next_cursor = if start + page.len() < matching.len() {
            page.last().map(|b| b.id)
        } else {
            None
        };

        BlueprintPage {
            meta: PageMeta { next_cursor },
            count: matching.len(),
            blueprints: page,
        }
    }

    /// Blueprint by id
    pub fn get(&self, id: &Uuid) -> ForgeResult<FlowBlueprint> {
        self.blueprints
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| ForgeError::not_found(format!("flow blueprint {}", id)))
    }

    /// New blueprints are inactive unless stated otherwise
    pub fn create(&self, new: NewFlowBlueprint) -> ForgeResult<FlowBlueprint> {
        let flows = new.flows.unwrap_or_else(|| serde_json::json!({ "flows": [] }));
        let modules = new.modules.unwrap_or_else(|| serde_json::json!({}));

        let mut errors = Vec::new();
        validate_name(&new.name, &mut errors);
        validate_object("flows", &flows, &mut errors);
        validate_object("modules", &modules, &mut errors);
        validation_result(errors)?;

        let now = Utc::now();
        let blueprint = FlowBlueprint {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description.unwrap_or_default(),
            category: new.category.unwrap_or_default(),
            active: new.active.unwrap_or(false),
            flows,
            modules,
            created_at: now,
            updated_at: now,
        };
        self.blueprints.write().insert(blueprint.id, blueprint.clone());

        tracing::info!(blueprint = %blueprint.id, name = %blueprint.name, "flow blueprint created");
        Ok(blueprint)
    }

    /// Apply changed scalar fields; flows and modules are replaced when present
    pub fn update(&self, id: &Uuid, update: FlowBlueprintUpdate) -> ForgeResult<FlowBlueprint> {
        let mut blueprints = self.blueprints.write();
        let current = blueprints
            .get(id)
            .ok_or_else(|| ForgeError::not_found(format!("flow blueprint {}", id)))?;

        let mut next = current.clone();
        let mut changed = false;

        fn assign<T: PartialEq>(slot: &mut T, value: Option<T>, changed: &mut bool) {
            if let Some(value) = value {
                if *slot != value {
                    *slot = value;
                    *changed = true;
                }
            }
        }
        assign(&mut next.name, update.name, &mut changed);
        assign(&mut next.description, update.description, &mut changed);
        assign(&mut next.category, update.category, &mut changed);
        assign(&mut next.active, update.active, &mut changed);

        if let Some(flows) = update.flows {
            next.flows = flows;
            changed = true;
        }
        if let Some(modules) = update.modules {
            next.modules = modules;
            changed = true;
        }

        let mut errors = Vec::new();
        validate_name(&next.name, &mut errors);
        validate_object("flows", &next.flows, &mut errors);
        validate_object("modules", &next.modules, &mut errors);
        validation_result(errors)?;

        if changed {
            next.updated_at = Utc::now();
            blueprints.insert(next.id, next.clone());
            tracing::info!(blueprint = %id, "flow blueprint updated");
        }
        Ok(next)
    }

    /// Remove a blueprint
    pub fn delete(&self, id: &Uuid) -> ForgeResult<()> {
        self.blueprints
            .write()
            .remove(id)
            .map(|_| tracing::info!(blueprint = %id, "flow blueprint deleted"))
            .ok_or_else(|| ForgeError::not_found(format!("flow blueprint {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn named(name: &str, active: Option<bool>) -> NewFlowBlueprint {
        NewFlowBlueprint {
            name: name.into(),
            active,
            ..Default::default()
        }
    }

    #[test]
    fn test_create_defaults_inactive() {
        let store = FlowBlueprintStore::new();
        let blueprint = store.create(named("starter", None)).unwrap();
        assert!(!blueprint.active);
        assert_eq!(blueprint.flows, json!({ "flows": [] }));
    }

    #[test]
    fn test_create_rejects_invalid_fields() {
        let store = FlowBlueprintStore::new();
        let err = store
            .create(NewFlowBlueprint {
                name: " ".into(),
                flows: Some(json!([1, 2])),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.http_status(), 400);
        assert_eq!(err.code(), "unexpected_error");
        assert_eq!(err.to_string(), "name must not be empty,flows must be an object");
    }

    #[test]
    fn test_list_filters() {
        let store = FlowBlueprintStore::new();
        store.create(named("a", Some(true))).unwrap();
        store.create(named("b", Some(false))).unwrap();
        store.create(named("c", Some(true))).unwrap();

        assert_eq!(store.list(BlueprintFilter::Active, Pagination::default()).count, 2);
        assert_eq!(store.list(BlueprintFilter::Inactive, Pagination::default()).count, 1);
        assert_eq!(store.list(BlueprintFilter::All, Pagination::default()).count, 3);
    }

    #[test]
    fn test_unknown_filter_means_active() {
        assert_eq!(BlueprintFilter::from_query("inactive"), BlueprintFilter::Inactive);
        assert_eq!(BlueprintFilter::from_query("all"), BlueprintFilter::All);
        assert_eq!(BlueprintFilter::from_query("active"), BlueprintFilter::Active);
        assert_eq!(BlueprintFilter::from_query("ALL"), BlueprintFilter::Active);
        assert_eq!(BlueprintFilter::from_query(""), BlueprintFilter::Active);
    }

    #[test]
    fn test_list_pages_with_cursor() {
        let store = FlowBlueprintStore::new();
        for name in ["a", "b", "c"] {
            store.create(named(name, Some(true))).unwrap();
        }

        let first = store.list(
            BlueprintFilter::All,
            Pagination {
                cursor: None,
                limit: Some(2),
            },
        );
        assert_eq!(first.blueprints.len(), 2);
        let cursor = first.meta.next_cursor.unwrap();

        let second = store.list(
            BlueprintFilter::All,
            Pagination {
                cursor: Some(cursor),
                limit: Some(2),
            },
        );
        assert_eq!(second.blueprints.len(), 1);
        assert!(second.meta.next_cursor.is_none());
        assert_eq!(second.count, 3);
    }

    #[test]
    fn test_update_only_touches_given_fields() {
        let store = FlowBlueprintStore::new();
        let created = store
            .create(NewFlowBlueprint {
                name: "a".into(),
                description: Some("first".into()),
                category: Some("starter".into()),
                ..Default::default()
            })
            .unwrap();

        let updated = store
            .update(
                &created.id,
                FlowBlueprintUpdate {
                    active: Some(true),
                    modules: Some(json!({ "node-red-dashboard": "1.0.0" })),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(updated.active);
        assert_eq!(updated.description, "first");
        assert_eq!(updated.category, "starter");
        assert_eq!(updated.flows, created.flows);
        assert_eq!(updated.modules, json!({ "node-red-dashboard": "1.0.0" }));
        assert!(updated.updated_at >= created.updated_at);
    }

    #[test]
    fn test_unchanged_update_keeps_timestamp() {
        let store = FlowBlueprintStore::new();
        let created = store.create(named("a", Some(true))).unwrap();
        let updated = store
            .update(
                &created.id,
                FlowBlueprintUpdate {
                    name: Some("a".into()),
                    active: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.updated_at, created.updated_at);
    }

    #[test]
    fn test_delete_and_missing() {
        let store = FlowBlueprintStore::new();
        let created = store.create(named("a", None)).unwrap();
        store.delete(&created.id).unwrap();
        assert!(matches!(store.get(&created.id), Err(ForgeError::NotFound(_))));
        assert!(store.delete(&created.id).is_err());
        assert!(store.update(&created.id, FlowBlueprintUpdate::default()).is_err());
    }
}
