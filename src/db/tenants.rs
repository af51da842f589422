//! Tenant repository: tenants and their self-service token policy.

use super::DbError;
use sqlx::SqlitePool;

/// A platform tenant.
#[derive(Debug, Clone)]
pub struct Tenant {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
}

/// Per-tenant continuation-token policy.
///
/// Created once per tenant and mutated by tenant administrators; the
/// access-control core only ever reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantSettings {
    pub tenant_id: i64,
    /// Continuation-token lifetime in hours. `None` means the server
    /// default applies.
    pub submission_token_expiry_hours: Option<i64>,
    /// Whether a continuation token keeps working after the submission is
    /// marked complete.
    pub token_valid_after_completion: bool,
    pub updated_at: i64,
}

/// Repository for tenant operations.
pub struct TenantRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> TenantRepository<'a> {
    /// Create a new tenant repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a tenant.
    pub async fn create(&self, name: &str) -> Result<Tenant, DbError> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO tenants (name, created_at)
            VALUES (?, ?)
            "#,
        )
        .bind(name)
        .bind(now)
        .execute(self.pool)
        .await?;

        Ok(Tenant {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            created_at: now,
        })
    }

    /// Look up a tenant's settings row, if one has been written.
    pub async fn settings_for(&self, tenant_id: i64) -> Result<Option<TenantSettings>, DbError> {
        let row = sqlx::query_as::<_, (i64, Option<i64>, bool, i64)>(
            r#"
            SELECT tenant_id, submission_token_expiry_hours, token_valid_after_completion, updated_at
            FROM tenant_settings
            WHERE tenant_id = ?
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(
            |(tenant_id, submission_token_expiry_hours, token_valid_after_completion, updated_at)| {
                TenantSettings {
                    tenant_id,
                    submission_token_expiry_hours,
                    token_valid_after_completion,
                    updated_at,
                }
            },
        ))
    }

    /// Write or replace a tenant's settings row.
    pub async fn upsert_settings(
        &self,
        tenant_id: i64,
        submission_token_expiry_hours: Option<i64>,
        token_valid_after_completion: bool,
    ) -> Result<(), DbError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO tenant_settings
                (tenant_id, submission_token_expiry_hours, token_valid_after_completion, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(tenant_id) DO UPDATE SET
                submission_token_expiry_hours = excluded.submission_token_expiry_hours,
                token_valid_after_completion = excluded.token_valid_after_completion,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(tenant_id)
        .bind(submission_token_expiry_hours)
        .bind(token_valid_after_completion)
        .bind(now)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
