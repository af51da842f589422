//! Access resolution: merge platform, tenant, role, and token authority
//! into one minimal permission set for a (form, submission) pair.
//!
//! A single pure decision per call, evaluated top to bottom with
//! short-circuit at the first matching branch. "No access" is a successful
//! answer (empty sets); the only hard failure is a missing form.

use std::collections::HashSet;

use thiserror::Error;
use tracing::debug;

use super::continuation::{ContinuationError, ContinuationTokenStore};
use super::perms::{Action, Actions, FormPermissions, SubmissionPermissions};
use crate::db::{Database, DbError};

/// Resolved identity of the caller, supplied per request by the identity
/// layer. Always passed explicitly; the resolver never reads ambient state.
#[derive(Debug, Clone)]
pub struct AuthorizationContext {
    pub user_id: Option<i64>,
    pub tenant_id: i64,
    pub roles: HashSet<String>,
    pub is_platform_admin: bool,
    /// Actions granted by the caller's roles.
    granted: Actions,
}

impl AuthorizationContext {
    /// An unauthenticated caller: no user, no roles, no grants.
    pub fn anonymous(tenant_id: i64) -> Self {
        Self {
            user_id: None,
            tenant_id,
            roles: HashSet::new(),
            is_platform_admin: false,
            granted: Actions::empty(),
        }
    }

    /// An authenticated caller with the given role names and grant set.
    pub fn authenticated(
        user_id: i64,
        tenant_id: i64,
        roles: HashSet<String>,
        granted: Actions,
    ) -> Self {
        Self {
            user_id: Some(user_id),
            tenant_id,
            roles,
            is_platform_admin: false,
            granted,
        }
    }

    /// Mark this context as platform admin.
    pub fn as_platform_admin(mut self) -> Self {
        self.is_platform_admin = true;
        self
    }

    /// RBAC check for a single action.
    pub fn has_permission(&self, action: Action) -> bool {
        self.granted.contains(action.flag())
    }
}

/// What the caller is asking about.
#[derive(Debug, Clone, Default)]
pub struct AccessRequest {
    pub form_id: i64,
    pub submission_id: Option<i64>,
    pub continuation_token: Option<String>,
}

/// The effective permission sets for one request. Computed fresh per call,
/// never cached here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub form_id: i64,
    pub submission_id: Option<i64>,
    pub form_permissions: FormPermissions,
    pub submission_permissions: SubmissionPermissions,
}

/// Failures of access resolution.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Form not found.")]
    FormNotFound,
    #[error(transparent)]
    Db(#[from] DbError),
}

impl AccessError {
    /// Static code for metrics labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::FormNotFound => "form_not_found",
            Self::Db(_) => "db_error",
        }
    }
}

/// The permission-resolution engine.
#[derive(Clone)]
pub struct AccessResolver {
    db: Database,
    continuations: ContinuationTokenStore,
}

impl AccessResolver {
    pub fn new(db: Database, continuations: ContinuationTokenStore) -> Self {
        Self { db, continuations }
    }

    /// Compute the effective permission sets for `request` on behalf of
    /// `ctx`.
    pub async fn resolve(
        &self,
        ctx: &AuthorizationContext,
        request: &AccessRequest,
    ) -> Result<AccessDecision, AccessError> {
        // Platform admin short-circuits everything, including the form load.
        if ctx.is_platform_admin {
            let submission_permissions = match request.submission_id {
                None => SubmissionPermissions::CREATE | SubmissionPermissions::UPLOAD_FILE,
                Some(_) => SubmissionPermissions::all(),
            };
            let decision = AccessDecision {
                form_id: request.form_id,
                submission_id: request.submission_id,
                form_permissions: FormPermissions::VIEW | FormPermissions::EDIT,
                submission_permissions,
            };
            debug!(form = request.form_id, "Access granted: platform admin");
            return Ok(decision);
        }

        let form = self
            .db
            .forms()
            .find_by_id(request.form_id)
            .await?
            .ok_or(AccessError::FormNotFound)?;

        let form_permissions = if form.is_public || ctx.has_permission(Action::FormView) {
            FormPermissions::VIEW
        } else {
            FormPermissions::empty()
        };

        let submission_permissions = self
            .submission_permissions(ctx, request, form.is_public)
            .await?;

        let decision = AccessDecision {
            form_id: request.form_id,
            submission_id: request.submission_id,
            form_permissions,
            submission_permissions,
        };
        debug!(
            form = request.form_id,
            submission = ?request.submission_id,
            user = ?ctx.user_id,
            form_permissions = ?decision.form_permissions,
            submission_permissions = ?decision.submission_permissions,
            "Access resolved"
        );
        Ok(decision)
    }

    /// Submission branch, in strict priority order.
    async fn submission_permissions(
        &self,
        ctx: &AuthorizationContext,
        request: &AccessRequest,
        form_is_public: bool,
    ) -> Result<SubmissionPermissions, AccessError> {
        // A continuation token grants the full self-service set, but only
        // when it resolves to exactly the submission the request names.
        // A token for submission A replayed against submission B grants
        // nothing.
        if let Some(token) = request
            .continuation_token
            .as_deref()
            .filter(|t| !t.is_empty())
        {
            match self.continuations.resolve(token).await {
                Ok(resolved_id) if Some(resolved_id) == request.submission_id => {
                    return Ok(SubmissionPermissions::SELF_SERVICE);
                }
                Ok(resolved_id) => {
                    debug!(
                        requested = ?request.submission_id,
                        resolved = resolved_id,
                        "Continuation token targets a different submission"
                    );
                }
                Err(ContinuationError::Db(e)) => return Err(e.into()),
                Err(e) => {
                    debug!(code = e.error_code(), "Continuation token grants nothing");
                }
            }
        }

        if form_is_public && request.submission_id.is_none() {
            return Ok(SubmissionPermissions::ANONYMOUS_RESPONDENT);
        }

        if request.submission_id.is_some()
            && ctx.has_permission(Action::SubmissionView)
            && ctx.has_permission(Action::SubmissionEdit)
        {
            return Ok(SubmissionPermissions::VIEW
                | SubmissionPermissions::EDIT
                | SubmissionPermissions::UPLOAD_FILE
                | SubmissionPermissions::DELETE_FILE);
        }

        Ok(SubmissionPermissions::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::continuation::ContinuationTokenStore;
    use crate::db::Database;

    async fn fixture() -> (AccessResolver, Database) {
        let db = Database::new(":memory:").await.unwrap();
        let continuations = ContinuationTokenStore::new(db.clone(), 24);
        (AccessResolver::new(db.clone(), continuations), db)
    }

    async fn seed_form(db: &Database, is_public: bool) -> (i64, i64) {
        let tenant = db.tenants().create("acme").await.unwrap();
        let form = db
            .forms()
            .create(tenant.id, "Survey", is_public)
            .await
            .unwrap();
        (tenant.id, form.id)
    }

    fn rbac_ctx(tenant_id: i64, granted: Actions) -> AuthorizationContext {
        AuthorizationContext::authenticated(
            1,
            tenant_id,
            HashSet::from(["reviewer".to_string()]),
            granted,
        )
    }

    #[tokio::test]
    async fn public_form_anonymous_no_submission() {
        let (resolver, db) = fixture().await;
        let (tenant_id, form_id) = seed_form(&db, true).await;

        let decision = resolver
            .resolve(
                &AuthorizationContext::anonymous(tenant_id),
                &AccessRequest {
                    form_id,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(decision.form_permissions, FormPermissions::VIEW);
        assert_eq!(
            decision.submission_permissions,
            SubmissionPermissions::CREATE | SubmissionPermissions::UPLOAD_FILE
        );
    }

    #[tokio::test]
    async fn public_form_with_submission_id_but_no_token() {
        let (resolver, db) = fixture().await;
        let (tenant_id, form_id) = seed_form(&db, true).await;

        let decision = resolver
            .resolve(
                &AuthorizationContext::anonymous(tenant_id),
                &AccessRequest {
                    form_id,
                    submission_id: Some(55),
                    continuation_token: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(
            decision.submission_permissions,
            SubmissionPermissions::empty()
        );
    }

    #[tokio::test]
    async fn private_form_anonymous_gets_nothing() {
        let (resolver, db) = fixture().await;
        let (tenant_id, form_id) = seed_form(&db, false).await;

        let decision = resolver
            .resolve(
                &AuthorizationContext::anonymous(tenant_id),
                &AccessRequest {
                    form_id,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(decision.form_permissions, FormPermissions::empty());
        assert_eq!(
            decision.submission_permissions,
            SubmissionPermissions::empty()
        );
    }

    #[tokio::test]
    async fn private_form_rbac_view_edit_on_submission() {
        let (resolver, db) = fixture().await;
        let (tenant_id, form_id) = seed_form(&db, false).await;

        let ctx = rbac_ctx(
            tenant_id,
            Actions::SUBMISSION_VIEW | Actions::SUBMISSION_EDIT,
        );
        let decision = resolver
            .resolve(
                &ctx,
                &AccessRequest {
                    form_id,
                    submission_id: Some(7),
                    continuation_token: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(
            decision.submission_permissions,
            SubmissionPermissions::VIEW
                | SubmissionPermissions::EDIT
                | SubmissionPermissions::UPLOAD_FILE
                | SubmissionPermissions::DELETE_FILE
        );
        // No form.view grant and the form is private
        assert_eq!(decision.form_permissions, FormPermissions::empty());
    }

    #[tokio::test]
    async fn rbac_view_alone_is_not_enough() {
        let (resolver, db) = fixture().await;
        let (tenant_id, form_id) = seed_form(&db, false).await;

        let ctx = rbac_ctx(tenant_id, Actions::SUBMISSION_VIEW);
        let decision = resolver
            .resolve(
                &ctx,
                &AccessRequest {
                    form_id,
                    submission_id: Some(7),
                    continuation_token: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(
            decision.submission_permissions,
            SubmissionPermissions::empty()
        );
    }

    #[tokio::test]
    async fn form_view_grant_opens_private_form() {
        let (resolver, db) = fixture().await;
        let (tenant_id, form_id) = seed_form(&db, false).await;

        let ctx = rbac_ctx(tenant_id, Actions::FORM_VIEW);
        let decision = resolver
            .resolve(
                &ctx,
                &AccessRequest {
                    form_id,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(decision.form_permissions, FormPermissions::VIEW);
    }

    #[tokio::test]
    async fn matching_continuation_token_grants_self_service() {
        let (resolver, db) = fixture().await;
        let (tenant_id, form_id) = seed_form(&db, false).await;
        let submission = db.submissions().create(form_id, tenant_id).await.unwrap();
        let token = ContinuationTokenStore::new(db.clone(), 24)
            .issue(submission.id)
            .await
            .unwrap();

        let decision = resolver
            .resolve(
                &AuthorizationContext::anonymous(tenant_id),
                &AccessRequest {
                    form_id,
                    submission_id: Some(submission.id),
                    continuation_token: Some(token),
                },
            )
            .await
            .unwrap();

        assert_eq!(
            decision.submission_permissions,
            SubmissionPermissions::SELF_SERVICE
        );
    }

    #[tokio::test]
    async fn token_for_another_submission_grants_nothing() {
        let (resolver, db) = fixture().await;
        let (tenant_id, form_id) = seed_form(&db, false).await;
        let first = db.submissions().create(form_id, tenant_id).await.unwrap();
        let second = db.submissions().create(form_id, tenant_id).await.unwrap();
        let token = ContinuationTokenStore::new(db.clone(), 24)
            .issue(first.id)
            .await
            .unwrap();

        // Replay the token for submission A against submission B
        let decision = resolver
            .resolve(
                &AuthorizationContext::anonymous(tenant_id),
                &AccessRequest {
                    form_id,
                    submission_id: Some(second.id),
                    continuation_token: Some(token),
                },
            )
            .await
            .unwrap();

        assert_eq!(
            decision.submission_permissions,
            SubmissionPermissions::empty()
        );
    }

    #[tokio::test]
    async fn unresolvable_token_falls_through_to_public_branch() {
        let (resolver, db) = fixture().await;
        let (tenant_id, form_id) = seed_form(&db, true).await;

        let decision = resolver
            .resolve(
                &AuthorizationContext::anonymous(tenant_id),
                &AccessRequest {
                    form_id,
                    submission_id: None,
                    continuation_token: Some("bogus-token".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(
            decision.submission_permissions,
            SubmissionPermissions::CREATE | SubmissionPermissions::UPLOAD_FILE
        );
    }

    #[tokio::test]
    async fn platform_admin_override() {
        let (resolver, db) = fixture().await;
        let (tenant_id, form_id) = seed_form(&db, false).await;

        let admin = AuthorizationContext::anonymous(tenant_id).as_platform_admin();

        let decision = resolver
            .resolve(
                &admin,
                &AccessRequest {
                    form_id,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            decision.form_permissions,
            FormPermissions::VIEW | FormPermissions::EDIT
        );
        assert_eq!(
            decision.submission_permissions,
            SubmissionPermissions::CREATE | SubmissionPermissions::UPLOAD_FILE
        );

        let decision = resolver
            .resolve(
                &admin,
                &AccessRequest {
                    form_id,
                    submission_id: Some(3),
                    continuation_token: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(decision.submission_permissions, SubmissionPermissions::all());
    }

    #[tokio::test]
    async fn missing_form_is_the_only_failure() {
        let (resolver, db) = fixture().await;
        let tenant = db.tenants().create("acme").await.unwrap();

        let err = resolver
            .resolve(
                &AuthorizationContext::anonymous(tenant.id),
                &AccessRequest {
                    form_id: 404,
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::FormNotFound));
    }
}
