//! Role-to-action grant mapping.
//!
//! Roles are opaque names attached to a caller by the identity layer; the
//! `[[authz.role]]` blocks in the configuration decide which actions each
//! role grants. The union of a caller's role grants becomes the RBAC set
//! checked by the access resolver.

use std::collections::HashMap;

use serde::Deserialize;

use crate::access::{Action, Actions};

/// One `[[authz.role]]` block.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleBlock {
    /// Role name as presented by the identity layer.
    pub name: String,
    /// Granted action names (e.g., "submission.view").
    pub grants: Vec<String>,
}

/// Compiled role map: role name -> granted action set.
#[derive(Debug, Clone, Default)]
pub struct RoleMap {
    grants: HashMap<String, Actions>,
}

impl RoleMap {
    /// Compile role blocks, rejecting unknown action names.
    pub fn from_blocks(blocks: &[RoleBlock]) -> Result<Self, String> {
        let mut grants: HashMap<String, Actions> = HashMap::new();
        for block in blocks {
            let mut actions = Actions::empty();
            for grant in &block.grants {
                match Action::parse(grant) {
                    Some(action) => actions |= action.flag(),
                    None => {
                        return Err(format!(
                            "role '{}' grants unknown action '{}'",
                            block.name, grant
                        ));
                    }
                }
            }
            // Duplicate blocks for the same role union their grants
            *grants.entry(block.name.clone()).or_insert(Actions::empty()) |= actions;
        }
        Ok(Self { grants })
    }

    /// Union of grants for a caller's roles. Unknown roles grant nothing.
    pub fn actions_for<I, S>(&self, roles: I) -> Actions
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut actions = Actions::empty();
        for role in roles {
            if let Some(granted) = self.grants.get(role.as_ref()) {
                actions |= *granted;
            }
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks() -> Vec<RoleBlock> {
        vec![
            RoleBlock {
                name: "reviewer".to_string(),
                grants: vec!["submission.view".to_string(), "submission.edit".to_string()],
            },
            RoleBlock {
                name: "form-manager".to_string(),
                grants: vec!["form.view".to_string(), "form.edit".to_string()],
            },
        ]
    }

    #[test]
    fn compiles_and_unions_roles() {
        let map = RoleMap::from_blocks(&blocks()).unwrap();

        let actions = map.actions_for(["reviewer"]);
        assert!(actions.contains(Actions::SUBMISSION_VIEW));
        assert!(actions.contains(Actions::SUBMISSION_EDIT));
        assert!(!actions.contains(Actions::FORM_VIEW));

        let actions = map.actions_for(["reviewer", "form-manager"]);
        assert!(actions.contains(Actions::FORM_EDIT));
        assert!(actions.contains(Actions::SUBMISSION_VIEW));
    }

    #[test]
    fn unknown_roles_grant_nothing() {
        let map = RoleMap::from_blocks(&blocks()).unwrap();
        assert_eq!(map.actions_for(["intern"]), Actions::empty());
    }

    #[test]
    fn unknown_action_names_are_rejected() {
        let bad = vec![RoleBlock {
            name: "reviewer".to_string(),
            grants: vec!["submission.destroy".to_string()],
        }];
        let err = RoleMap::from_blocks(&bad).unwrap_err();
        assert!(err.contains("submission.destroy"));
    }
}
