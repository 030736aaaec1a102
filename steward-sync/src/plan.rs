//! Dry-run preview of the remote mutations create or update would issue.
//!
//! The order here is the order [`crate::lifecycle::Lifecycle`] issues calls in;
//! no calls are made.

use std::collections::HashSet;
use std::fmt;

use steward_core::{DesiredState, ResourceIdentity};

use crate::reconcile::{attributes_changed, reconcile};

/// One remote mutation in a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedCall {
    CreateUser { identity: ResourceIdentity },
    UpdateAttributes { count: usize },
    AddToGroup(String),
    RemoveFromGroup(String),
    SetPassword { permanent: bool },
    /// A create-only field changed: delete the old user, create the new one.
    Replace {
        from: ResourceIdentity,
        to: ResourceIdentity,
    },
}

impl fmt::Display for PlannedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlannedCall::CreateUser { identity } => write!(f, "+ create user {identity}"),
            PlannedCall::UpdateAttributes { count } => {
                write!(f, "~ replace user attributes ({count} declared)")
            }
            PlannedCall::AddToGroup(group) => write!(f, "+ add to group {group}"),
            PlannedCall::RemoveFromGroup(group) => write!(f, "- remove from group {group}"),
            PlannedCall::SetPassword { permanent: true } => write!(f, "~ set permanent password"),
            PlannedCall::SetPassword { permanent: false } => write!(f, "~ set temporary password"),
            PlannedCall::Replace { from, to } => {
                write!(f, "± replace {from} with {to} (destroy, then create)")
            }
        }
    }
}

/// Ordered list of remote mutations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub calls: Vec<PlannedCall>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn requires_replacement(&self) -> bool {
        self.calls
            .iter()
            .any(|c| matches!(c, PlannedCall::Replace { .. }))
    }
}

/// Plan the convergence from `previous` (last applied, if any) to `desired`.
pub fn plan(previous: Option<&DesiredState>, desired: &DesiredState) -> Plan {
    match previous {
        None => plan_create(desired),
        Some(prev) if forces_replacement(prev, desired) => {
            Plan {
                calls: vec![PlannedCall::Replace {
                    from: prev.identity(),
                    to: desired.identity(),
                }],
            }
        }
        Some(prev) => plan_update(prev, desired),
    }
}

/// Whether going from `previous` to `desired` changes a field the directory
/// only accepts at creation: `pool_id`, `username` or `validation_data`.
pub fn forces_replacement(previous: &DesiredState, desired: &DesiredState) -> bool {
    previous.pool_id != desired.pool_id
        || previous.username != desired.username
        || previous.validation_data.iter().collect::<HashSet<_>>()
            != desired.validation_data.iter().collect::<HashSet<_>>()
}

fn plan_create(desired: &DesiredState) -> Plan {
    let mut calls = vec![PlannedCall::CreateUser {
        identity: desired.identity(),
    }];
    calls.extend(
        desired
            .sorted_groups()
            .into_iter()
            .map(|g| PlannedCall::AddToGroup(g.to_string())),
    );
    if desired.password.permanent().is_some() {
        calls.push(PlannedCall::SetPassword { permanent: true });
    }
    Plan { calls }
}

fn plan_update(previous: &DesiredState, desired: &DesiredState) -> Plan {
    let mut calls = Vec::new();
    if attributes_changed(&previous.user_attributes, &desired.user_attributes) {
        calls.push(PlannedCall::UpdateAttributes {
            count: desired.user_attributes.len(),
        });
    }
    let delta = reconcile(&previous.groups, &desired.groups).sorted();
    calls.extend(delta.to_add.into_iter().map(PlannedCall::AddToGroup));
    calls.extend(delta.to_remove.into_iter().map(PlannedCall::RemoveFromGroup));
    Plan { calls }
}

#[cfg(test)]
mod tests {
    use super::*;
    use steward_core::{Attribute, PasswordPolicy};

    fn desired(groups: &[&str]) -> DesiredState {
        let mut d = DesiredState::new("poolX".into(), "alice".into());
        d.groups = groups.iter().map(|g| g.to_string()).collect();
        d
    }

    #[test]
    fn create_plan_orders_user_groups_password() {
        let mut d = desired(&["readers", "admins"]);
        d.password = PasswordPolicy::Permanent("Perm-Pass-1".into());
        let p = plan(None, &d);
        assert_eq!(
            p.calls,
            vec![
                PlannedCall::CreateUser { identity: d.identity() },
                PlannedCall::AddToGroup("admins".into()),
                PlannedCall::AddToGroup("readers".into()),
                PlannedCall::SetPassword { permanent: true },
            ]
        );
    }

    #[test]
    fn unchanged_declaration_plans_nothing() {
        let mut d = desired(&["a"]);
        d.user_attributes = vec![Attribute::new("email", "a@x")];
        assert!(plan(Some(&d), &d.clone()).is_empty());
    }

    #[test]
    fn identity_change_plans_exactly_replace() {
        let prev = desired(&["a"]);
        let mut next = desired(&["b"]);
        next.pool_id = "poolY".into();
        let p = plan(Some(&prev), &next);
        assert_eq!(p.calls.len(), 1);
        assert!(p.requires_replacement());
    }

    #[test]
    fn validation_data_change_plans_replace() {
        let mut prev = desired(&["a"]);
        prev.validation_data = vec![Attribute::new("invite", "v1")];
        let mut next = prev.clone();
        next.validation_data = vec![Attribute::new("invite", "v2")];
        let p = plan(Some(&prev), &next);
        assert_eq!(
            p.calls,
            vec![PlannedCall::Replace { from: prev.identity(), to: next.identity() }]
        );

        let mut reordered = prev.clone();
        reordered.validation_data = vec![Attribute::new("invite", "v1")];
        assert!(!forces_replacement(&prev, &reordered));
    }

    #[test]
    fn update_plan_adds_before_removes() {
        let p = plan(Some(&desired(&["a", "b"])), &desired(&["b", "c"]));
        assert_eq!(
            p.calls,
            vec![
                PlannedCall::AddToGroup("c".into()),
                PlannedCall::RemoveFromGroup("a".into()),
            ]
        );
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(PlannedCall::AddToGroup("ops".into()).to_string(), "+ add to group ops");
        assert_eq!(
            PlannedCall::RemoveFromGroup("ops".into()).to_string(),
            "- remove from group ops"
        );
    }
}
