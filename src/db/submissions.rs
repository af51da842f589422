//! Submission repository.
//!
//! A submission owns at most one continuation token, stored inline on its
//! row. Token values are globally unique (partial unique index); replacing
//! a token invalidates the previous value permanently.

use super::DbError;
use sqlx::SqlitePool;

/// A form submission row.
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: i64,
    pub form_id: i64,
    pub tenant_id: i64,
    pub is_completed: bool,
    /// Current continuation-token value, if one has been issued.
    pub continuation_token: Option<String>,
    /// Expiry of the current continuation token (epoch seconds).
    pub continuation_expires_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, form_id, tenant_id, is_completed,
           continuation_token, continuation_expires_at,
           created_at, updated_at
    FROM submissions
"#;

type SubmissionRow = (i64, i64, i64, bool, Option<String>, Option<i64>, i64, i64);

fn from_row(row: SubmissionRow) -> Submission {
    let (
        id,
        form_id,
        tenant_id,
        is_completed,
        continuation_token,
        continuation_expires_at,
        created_at,
        updated_at,
    ) = row;
    Submission {
        id,
        form_id,
        tenant_id,
        is_completed,
        continuation_token,
        continuation_expires_at,
        created_at,
        updated_at,
    }
}

/// Repository for submission operations.
pub struct SubmissionRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SubmissionRepository<'a> {
    /// Create a new submission repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a submission for a form.
    pub async fn create(&self, form_id: i64, tenant_id: i64) -> Result<Submission, DbError> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO submissions (form_id, tenant_id, is_completed, created_at, updated_at)
            VALUES (?, ?, 0, ?, ?)
            "#,
        )
        .bind(form_id)
        .bind(tenant_id)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await?;

        Ok(Submission {
            id: result.last_insert_rowid(),
            form_id,
            tenant_id,
            is_completed: false,
            continuation_token: None,
            continuation_expires_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Find a submission by id.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Submission>, DbError> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(from_row))
    }

    /// Find the submission holding a given continuation-token value.
    ///
    /// Exact-match point lookup on the unique token index; a near-miss is
    /// indistinguishable from no match.
    pub async fn find_by_continuation_token(
        &self,
        token: &str,
    ) -> Result<Option<Submission>, DbError> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "{SELECT_COLUMNS} WHERE continuation_token = ?"
        ))
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(from_row))
    }

    /// Store a continuation token on a submission, replacing any previous
    /// value. The old value is gone for good: only the current value
    /// resolves.
    ///
    /// A unique-index violation (another submission already holds this
    /// value) is surfaced as [`DbError::ContinuationTokenCollision`] so the
    /// issuing store can regenerate and retry.
    pub async fn set_continuation_token(
        &self,
        id: i64,
        token: &str,
        expires_at: i64,
    ) -> Result<(), DbError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            UPDATE submissions
            SET continuation_token = ?, continuation_expires_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(token)
        .bind(expires_at)
        .bind(now)
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return DbError::ContinuationTokenCollision;
            }
            DbError::from(e)
        })?;

        Ok(())
    }

    /// Mark a submission complete (or reopen it).
    pub async fn set_completed(&self, id: i64, completed: bool) -> Result<(), DbError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            UPDATE submissions
            SET is_completed = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(completed)
        .bind(now)
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
