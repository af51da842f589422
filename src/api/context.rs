//! Caller-context assembly.
//!
//! Identity resolution happens upstream (gateway or middleware); by the
//! time a request reaches this service, the caller's identity arrives
//! pre-resolved in headers. This module only folds the caller's roles
//! through the configured role map into an [`AuthorizationContext`] - it
//! never authenticates anything itself.

use std::collections::HashSet;

use axum::http::HeaderMap;

use crate::access::AuthorizationContext;
use crate::config::RoleMap;
use crate::error::ApiError;

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const USER_HEADER: &str = "x-user-id";
pub const ROLES_HEADER: &str = "x-roles";
pub const PLATFORM_ADMIN_HEADER: &str = "x-platform-admin";

/// Build the caller's authorization context from identity headers.
pub fn context_from_headers(
    headers: &HeaderMap,
    role_map: &RoleMap,
) -> Result<AuthorizationContext, ApiError> {
    let tenant_id = match header_str(headers, TENANT_HEADER)? {
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| ApiError::bad_request(format!("{TENANT_HEADER} must be an integer")))?,
        None => 0,
    };

    let user_id = match header_str(headers, USER_HEADER)? {
        Some(raw) => Some(
            raw.parse::<i64>()
                .map_err(|_| ApiError::bad_request(format!("{USER_HEADER} must be an integer")))?,
        ),
        None => None,
    };

    let roles: HashSet<String> = header_str(headers, ROLES_HEADER)?
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let is_platform_admin = matches!(
        header_str(headers, PLATFORM_ADMIN_HEADER)?,
        Some("true") | Some("1")
    );

    let ctx = match user_id {
        Some(user_id) => {
            let granted = role_map.actions_for(&roles);
            AuthorizationContext::authenticated(user_id, tenant_id, roles, granted)
        }
        None => AuthorizationContext::anonymous(tenant_id),
    };

    Ok(if is_platform_admin {
        ctx.as_platform_admin()
    } else {
        ctx
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, ApiError> {
    match headers.get(name) {
        Some(value) => value
            .to_str()
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("{name} is not valid ASCII"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{Action, Actions};
    use crate::config::{RoleBlock, RoleMap};

    fn role_map() -> RoleMap {
        RoleMap::from_blocks(&[RoleBlock {
            name: "reviewer".to_string(),
            grants: vec!["submission.view".to_string(), "submission.edit".to_string()],
        }])
        .unwrap()
    }

    #[test]
    fn missing_headers_mean_anonymous() {
        let ctx = context_from_headers(&HeaderMap::new(), &role_map()).unwrap();
        assert!(ctx.user_id.is_none());
        assert!(!ctx.is_platform_admin);
        assert!(!ctx.has_permission(Action::SubmissionView));
    }

    #[test]
    fn roles_fold_through_the_map() {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_HEADER, "7".parse().unwrap());
        headers.insert(USER_HEADER, "12".parse().unwrap());
        headers.insert(ROLES_HEADER, "reviewer, intern".parse().unwrap());

        let ctx = context_from_headers(&headers, &role_map()).unwrap();
        assert_eq!(ctx.user_id, Some(12));
        assert_eq!(ctx.tenant_id, 7);
        assert!(ctx.has_permission(Action::SubmissionView));
        assert!(ctx.has_permission(Action::SubmissionEdit));
        assert!(!ctx.has_permission(Action::FormView));
    }

    #[test]
    fn platform_admin_flag() {
        let mut headers = HeaderMap::new();
        headers.insert(PLATFORM_ADMIN_HEADER, "true".parse().unwrap());
        let ctx = context_from_headers(&headers, &role_map()).unwrap();
        assert!(ctx.is_platform_admin);
    }

    #[test]
    fn unparsable_ids_are_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_HEADER, "acme".parse().unwrap());
        assert!(context_from_headers(&headers, &role_map()).is_err());
    }

    #[test]
    fn roles_without_user_grant_nothing() {
        let mut headers = HeaderMap::new();
        headers.insert(ROLES_HEADER, "reviewer".parse().unwrap());
        let ctx = context_from_headers(&headers, &role_map()).unwrap();
        assert!(!ctx.has_permission(Action::SubmissionView));
        assert_eq!(role_map().actions_for(["reviewer"]), Actions::SUBMISSION_VIEW | Actions::SUBMISSION_EDIT);
    }
}
