//! Desired-state table
//!
//! Pure configuration: one entry per collection, each a list of `IndexSpec`
//! in the order they are reconciled. The table is an ordinary value handed
//! to the orchestrator, so tests can build their own.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::{asc, desc, IndexSpec};
use crate::error::{ReconcileError, Result};

/// Desired indexes for one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionIndexes {
    pub collection: String,
    pub indexes: Vec<IndexSpec>,
}

impl CollectionIndexes {
    pub fn new(collection: impl Into<String>, indexes: Vec<IndexSpec>) -> Self {
        Self {
            collection: collection.into(),
            indexes,
        }
    }
}

/// Every collection's wanted indexes, in reconciliation order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredState {
    pub collections: Vec<CollectionIndexes>,
}

impl DesiredState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a collection entry (builder style)
    pub fn collection(mut self, collection: impl Into<String>, indexes: Vec<IndexSpec>) -> Self {
        self.collections.push(CollectionIndexes::new(collection, indexes));
        self
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Total number of desired indexes across all collections
    pub fn index_count(&self) -> usize {
        self.collections.iter().map(|c| c.indexes.len()).sum()
    }

    /// Reject tables reconciliation cannot converge on.
    ///
    /// Runs before any database call. Collects every problem instead of
    /// stopping at the first one.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        let mut seen_collections = HashSet::new();

        for entry in &self.collections {
            if entry.collection.is_empty() {
                problems.push("collection with empty name".to_string());
            }
            if !seen_collections.insert(entry.collection.as_str()) {
                problems.push(format!("{}: declared more than once", entry.collection));
            }

            let mut signatures = HashSet::new();
            let mut names = HashSet::new();
            for spec in &entry.indexes {
                let name = spec.effective_name();
                if spec.keys.is_empty() {
                    problems.push(format!("{}({}): empty key list", entry.collection, name));
                    continue;
                }
                if let Some(key) = spec.keys.iter().find(|key| !key.direction.is_directional()) {
                    problems.push(format!(
                        "{}({}): field {} must be ascending or descending",
                        entry.collection, name, key.field
                    ));
                }
                if !signatures.insert(spec.signature()) {
                    problems.push(format!(
                        "{}({}): duplicate key signature {}",
                        entry.collection,
                        name,
                        spec.signature()
                    ));
                }
                if !names.insert(name.clone()) {
                    problems.push(format!("{}({}): duplicate index name", entry.collection, name));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ReconcileError::invalid_desired_state(problems.join("; ")))
        }
    }

    /// The application's index table.
    pub fn standard() -> Self {
        Self::new()
            .collection("users", users())
            .collection("organizations", organizations())
            .collection("groups", groups())
            .collection("group_memberships", group_memberships())
            .collection("resources", resources())
            .collection("group_resource_assignments", group_resource_assignments())
            .collection("materials", materials())
            .collection("material_assignments", material_assignments())
            // dashboards read "recent activity" from login_records
            .collection("login_records", login_records())
            .collection("pages", pages())
    }
}

fn users() -> Vec<IndexSpec> {
    vec![
        // Global, cross-org identity
        IndexSpec::unique_named("uniq_users_email", [asc("email")]),
        // Member lists: {role, org} prefix, optional status filter, name sort, stable tiebreak
        IndexSpec::named(
            "idx_users_role_org_status_fullnameci_id",
            [
                asc("role"),
                asc("organization_id"),
                asc("status"),
                asc("full_name_ci"),
                asc("_id"),
            ],
        ),
        // System users (no org filter)
        IndexSpec::named(
            "idx_users_role_status_fullnameci_id",
            [asc("role"), asc("status"), asc("full_name_ci"), asc("_id")],
        ),
        // Member lists sorted by email
        IndexSpec::named(
            "idx_users_role_org_status_email_id",
            [
                asc("role"),
                asc("organization_id"),
                asc("status"),
                asc("email"),
                asc("_id"),
            ],
        ),
        IndexSpec::named("idx_users_org", [asc("organization_id")]),
        // Per-org counts by role
        IndexSpec::named("idx_users_role_org", [asc("role"), asc("organization_id")]),
    ]
}

fn organizations() -> Vec<IndexSpec> {
    vec![
        // name_ci is case/diacritics folded
        IndexSpec::unique_named("uniq_orgs_nameci", [asc("name_ci")]),
        IndexSpec::named("idx_orgs_nameci__id", [asc("name_ci"), asc("_id")]),
        IndexSpec::named(
            "idx_orgs_status_nameci__id",
            [asc("status"), asc("name_ci"), asc("_id")],
        ),
        IndexSpec::named("idx_orgs_cityci", [asc("city_ci")]),
        IndexSpec::named("idx_orgs_stateci", [asc("state_ci")]),
    ]
}

fn groups() -> Vec<IndexSpec> {
    vec![
        // No duplicate group names inside one org
        IndexSpec::unique_named(
            "uniq_group_org_nameci",
            [asc("organization_id"), asc("name_ci")],
        ),
        IndexSpec::named("idx_groups_org", [asc("organization_id")]),
        IndexSpec::named(
            "idx_groups_org_status_nameci__id",
            [
                asc("organization_id"),
                asc("status"),
                asc("name_ci"),
                asc("_id"),
            ],
        ),
    ]
}

fn group_memberships() -> Vec<IndexSpec> {
    vec![
        // One membership per (user, group); role changes update the document
        IndexSpec::unique_named("uniq_gm_user_group", [asc("user_id"), asc("group_id")]),
        IndexSpec::named(
            "idx_gm_group_role_user",
            [asc("group_id"), asc("role"), asc("user_id")],
        ),
        IndexSpec::named(
            "idx_gm_user_role_group",
            [asc("user_id"), asc("role"), asc("group_id")],
        ),
        IndexSpec::named(
            "idx_gm_org_role_group",
            [asc("org_id"), asc("role"), asc("group_id")],
        ),
    ]
}

fn resources() -> Vec<IndexSpec> {
    vec![
        IndexSpec::unique_named("uniq_resources_titleci", [asc("title_ci")]),
        IndexSpec::named(
            "idx_resources_status_titleci__id",
            [asc("status"), asc("title_ci"), asc("_id")],
        ),
        IndexSpec::named("idx_resources_subjectci", [asc("subject_ci")]),
        IndexSpec::named("idx_resources_type", [asc("type")]),
    ]
}

fn group_resource_assignments() -> Vec<IndexSpec> {
    vec![
        // Non-unique: a resource may be assigned to a group more than once
        IndexSpec::named(
            "idx_assign_group_resource",
            [asc("group_id"), asc("resource_id")],
        ),
        IndexSpec::named("idx_assign_group", [asc("group_id")]),
        IndexSpec::named("idx_assign_resource", [asc("resource_id")]),
        IndexSpec::named(
            "idx_assign_group_created",
            [asc("group_id"), desc("created_at")],
        ),
        IndexSpec::named(
            "idx_assign_resource_created",
            [asc("resource_id"), desc("created_at")],
        ),
    ]
}

fn materials() -> Vec<IndexSpec> {
    vec![
        IndexSpec::unique_named("uniq_materials_titleci", [asc("title_ci")]),
        IndexSpec::named(
            "idx_materials_status_titleci__id",
            [asc("status"), asc("title_ci"), asc("_id")],
        ),
        IndexSpec::named("idx_materials_type", [asc("type")]),
    ]
}

fn material_assignments() -> Vec<IndexSpec> {
    vec![
        IndexSpec::named("idx_matassign_org", [asc("organization_id")]),
        IndexSpec::named("idx_matassign_leader", [asc("leader_id")]),
        IndexSpec::named("idx_matassign_material", [asc("material_id")]),
        // (organization_id = leader's org) OR (leader_id = leader)
        IndexSpec::named(
            "idx_matassign_org_leader",
            [asc("organization_id"), asc("leader_id")],
        ),
    ]
}

fn login_records() -> Vec<IndexSpec> {
    vec![
        IndexSpec::named(
            "idx_logins_user_created",
            [asc("user_id"), desc("created_at")],
        ),
        IndexSpec::named("idx_logins_created", [desc("created_at")]),
    ]
}

fn pages() -> Vec<IndexSpec> {
    vec![IndexSpec::unique_named("uniq_pages_slug", [asc("slug")])]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IndexKey, KeyDirection};
    use crate::error::ErrorKind;

    #[test]
    fn test_standard_table_is_valid() {
        let desired = DesiredState::standard();
        desired.validate().unwrap();
        assert_eq!(desired.len(), 10);
        assert_eq!(desired.index_count(), 37);
    }

    #[test]
    fn test_standard_table_order() {
        let desired = DesiredState::standard();
        let names: Vec<&str> = desired
            .collections
            .iter()
            .map(|c| c.collection.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "users",
                "organizations",
                "groups",
                "group_memberships",
                "resources",
                "group_resource_assignments",
                "materials",
                "material_assignments",
                "login_records",
                "pages",
            ]
        );
    }

    #[test]
    fn test_validate_duplicate_signature() {
        let desired = DesiredState::new().collection(
            "users",
            vec![
                IndexSpec::unique_named("uniq_users_email", [asc("email")]),
                IndexSpec::named("idx_users_email", [asc("email")]),
            ],
        );

        let err = desired.validate().unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidDesiredState);
        assert!(err.message.contains("duplicate key signature email:1"));
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let desired = DesiredState::new()
            .collection("a", vec![IndexSpec::named("idx_empty", Vec::<IndexKey>::new())])
            .collection(
                "b",
                vec![
                    IndexSpec::named("same", [asc("x")]),
                    IndexSpec::named("same", [asc("y")]),
                ],
            )
            .collection("a", vec![]);

        let message = desired.validate().unwrap_err().message;
        assert!(message.contains("a(idx_empty): empty key list"));
        assert!(message.contains("b(same): duplicate index name"));
        assert!(message.contains("a: declared more than once"));
    }

    #[test]
    fn test_validate_rejects_non_directional_key() {
        let text = IndexKey::new("body", KeyDirection::Other("text".to_string()));
        let desired = DesiredState::new().collection("posts", vec![IndexSpec::named("idx_text", [text])]);

        let message = desired.validate().unwrap_err().message;
        assert!(message.contains("field body must be ascending or descending"));
    }

    #[test]
    fn test_same_fields_different_order_is_allowed() {
        let desired = DesiredState::new().collection(
            "group_memberships",
            vec![
                IndexSpec::named("a", [asc("user_id"), asc("group_id")]),
                IndexSpec::named("b", [asc("group_id"), asc("user_id")]),
            ],
        );
        desired.validate().unwrap();
    }
}
