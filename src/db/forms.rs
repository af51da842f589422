//! Form repository.

use super::DbError;
use sqlx::SqlitePool;

/// A form definition header.
///
/// `is_public` is the sole authority for whether anonymous respondents may
/// start submissions; the access-control core reads it and never writes it.
#[derive(Debug, Clone)]
pub struct Form {
    pub id: i64,
    pub tenant_id: i64,
    pub title: String,
    pub is_public: bool,
    pub created_at: i64,
}

/// Repository for form operations.
pub struct FormRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FormRepository<'a> {
    /// Create a new form repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a form.
    pub async fn create(
        &self,
        tenant_id: i64,
        title: &str,
        is_public: bool,
    ) -> Result<Form, DbError> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO forms (tenant_id, title, is_public, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(tenant_id)
        .bind(title)
        .bind(is_public)
        .bind(now)
        .execute(self.pool)
        .await?;

        Ok(Form {
            id: result.last_insert_rowid(),
            tenant_id,
            title: title.to_string(),
            is_public,
            created_at: now,
        })
    }

    /// Find a form by id.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Form>, DbError> {
        let row = sqlx::query_as::<_, (i64, i64, String, bool, i64)>(
            r#"
            SELECT id, tenant_id, title, is_public, created_at
            FROM forms
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(id, tenant_id, title, is_public, created_at)| Form {
            id,
            tenant_id,
            title,
            is_public,
            created_at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    #[tokio::test]
    async fn create_and_find_form() {
        let db = Database::new(":memory:").await.unwrap();
        let tenant = db.tenants().create("acme").await.unwrap();
        let form = db
            .forms()
            .create(tenant.id, "Customer survey", true)
            .await
            .unwrap();

        let found = db.forms().find_by_id(form.id).await.unwrap().unwrap();
        assert_eq!(found.title, "Customer survey");
        assert!(found.is_public);
        assert_eq!(found.tenant_id, tenant.id);

        assert!(db.forms().find_by_id(999).await.unwrap().is_none());
    }
}
