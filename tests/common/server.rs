//! Test server management.
//!
//! Spawns and manages formsd instances for integration testing.

use std::path::PathBuf;
use std::process::{Child, Command};
use std::time::Duration;
use tokio::time::sleep;

/// A test server instance.
pub struct TestServer {
    child: Child,
    port: u16,
    data_dir: PathBuf,
}

impl TestServer {
    /// Spawn a new test server with the given configuration.
    pub async fn spawn(port: u16) -> anyhow::Result<Self> {
        // Create temporary directory for test data
        let data_dir = std::env::temp_dir().join(format!("formsd-test-{}", port));
        std::fs::create_dir_all(&data_dir)?;

        // Create minimal test configuration
        let config_path = data_dir.join("config.toml");
        let config_content = format!(
            r#"
[server]
name = "forms.test"

[listen]
address = "127.0.0.1:{}"

[database]
path = "{}/test.db"

[security]
signing_secret = "integration-test-signing-secret-9X2k"

[tokens]
default_continuation_expiry_hours = 24
max_capability_expiry_minutes = 10080

[[authz.role]]
name = "reviewer"
grants = ["submission.view", "submission.edit"]

[[authz.role]]
name = "form-manager"
grants = ["form.view", "form.edit"]
"#,
            port,
            data_dir.display()
        );

        std::fs::write(&config_path, config_content)?;

        // Spawn the server binary cargo built for this test run
        let child = Command::new(env!("CARGO_BIN_EXE_formsd"))
            .arg(config_path.to_str().unwrap())
            .spawn()?;

        let server = Self {
            child,
            port,
            data_dir,
        };

        // Wait for server to start listening
        server.wait_until_ready().await?;

        Ok(server)
    }

    /// Wait until the server is accepting connections.
    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..50 {
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("server did not become ready on port {}", self.port)
    }

    /// Base URL of the API.
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Path of the server's SQLite database.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("test.db")
    }

    /// Open a second connection to the server's database for seeding.
    pub async fn seed_pool(&self) -> anyhow::Result<sqlx::SqlitePool> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&format!("sqlite:{}", self.db_path().display()))
            .await?;
        Ok(pool)
    }

    /// Insert a tenant and return its id.
    pub async fn seed_tenant(pool: &sqlx::SqlitePool, name: &str) -> anyhow::Result<i64> {
        let result = sqlx::query("INSERT INTO tenants (name, created_at) VALUES (?, 0)")
            .bind(name)
            .execute(pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Insert a form and return its id.
    pub async fn seed_form(
        pool: &sqlx::SqlitePool,
        tenant_id: i64,
        is_public: bool,
    ) -> anyhow::Result<i64> {
        let result = sqlx::query(
            "INSERT INTO forms (tenant_id, title, is_public, created_at) VALUES (?, 'Survey', ?, 0)",
        )
        .bind(tenant_id)
        .bind(is_public)
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Insert a submission and return its id.
    pub async fn seed_submission(
        pool: &sqlx::SqlitePool,
        form_id: i64,
        tenant_id: i64,
    ) -> anyhow::Result<i64> {
        let result = sqlx::query(
            "INSERT INTO submissions (form_id, tenant_id, is_completed, created_at, updated_at) \
             VALUES (?, ?, 0, 0, 0)",
        )
        .bind(form_id)
        .bind(tenant_id)
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(&self.data_dir);
    }
}
