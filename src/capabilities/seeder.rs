//! Schema seeding.
//!
//! # Responsibilities
//! - Initialize the SQL driver against the registry's database endpoint
//! - Execute SQL files verbatim (multi-statement)
//! - Execute literal create-table then create-index statements

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::sync::OnceCell;

use super::registry::DatabaseEndpoint;

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("SQL driver not initialized")]
    NotInitialized,

    #[error("failed to read SQL file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SQL file {} is empty", .0.display())]
    Empty(PathBuf),

    #[error("invalid database endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error(transparent)]
    Driver(#[from] sqlx::Error),
}

#[async_trait]
pub trait SchemaSeeder: Send + Sync {
    /// Initialize the driver. Called once per SQL phase.
    async fn init(&self, endpoint: &DatabaseEndpoint) -> Result<(), SeedError>;

    /// Execute every statement in the file at `path`.
    async fn load_file(&self, path: &Path) -> Result<(), SeedError>;

    /// Execute literal statements, tables first. Failures are logged, not returned.
    async fn seed(&self, table_stmts: &[String], index_stmts: &[String]);
}

async fn read_sql(path: &Path) -> Result<String, SeedError> {
    let sql = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    if sql.trim().is_empty() {
        return Err(SeedError::Empty(path.to_path_buf()));
    }
    Ok(sql)
}

/// [`SchemaSeeder`] over a `sqlx` Postgres pool.
pub struct PgSeeder {
    pool: OnceCell<PgPool>,
    max_connections: u32,
    connect_timeout: Duration,
}

impl PgSeeder {
    pub fn new() -> Self {
        Self {
            pool: OnceCell::new(),
            max_connections: 5,
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// The pool, once [`SchemaSeeder::init`] succeeded.
    pub fn pool(&self) -> Option<&PgPool> {
        self.pool.get()
    }
}

impl Default for PgSeeder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SchemaSeeder for PgSeeder {
    async fn init(&self, endpoint: &DatabaseEndpoint) -> Result<(), SeedError> {
        let url = endpoint.connection_url()?;
        self.pool
            .get_or_try_init(|| async {
                tracing::debug!(host = %endpoint.host, port = endpoint.port, database = %endpoint.database, "connecting to postgres");
                PgPoolOptions::new()
                    .max_connections(self.max_connections)
                    .acquire_timeout(self.connect_timeout)
                    .connect(url.as_str())
                    .await
            })
            .await?;
        Ok(())
    }

    async fn load_file(&self, path: &Path) -> Result<(), SeedError> {
        let pool = self.pool.get().ok_or(SeedError::NotInitialized)?;
        let sql = read_sql(path).await?;
        sqlx::raw_sql(&sql).execute(pool).await?;
        Ok(())
    }

    async fn seed(&self, table_stmts: &[String], index_stmts: &[String]) {
        let Some(pool) = self.pool.get() else {
            tracing::error!("sql: seed called before the driver was initialized");
            return;
        };

        for stmt in table_stmts.iter().chain(index_stmts) {
            if let Err(e) = sqlx::raw_sql(stmt).execute(pool).await {
                tracing::error!(error = %e, statement = %stmt, "sql: statement failed");
            }
        }
    }
}

/// [`SchemaSeeder`] that records what it would have executed, in order.
///
/// Selected with `driver = "memory"` for dry runs.
#[derive(Debug, Default)]
pub struct MemorySeeder {
    endpoint: Mutex<Option<DatabaseEndpoint>>,
    executed: Mutex<Vec<String>>,
}

impl MemorySeeder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endpoint(&self) -> Option<DatabaseEndpoint> {
        self.endpoint.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// SQL text executed so far: whole file contents, then literal statements.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, sql: String) {
        self.executed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(sql);
    }
}

#[async_trait]
impl SchemaSeeder for MemorySeeder {
    async fn init(&self, endpoint: &DatabaseEndpoint) -> Result<(), SeedError> {
        *self.endpoint.lock().unwrap_or_else(|e| e.into_inner()) = Some(endpoint.clone());
        Ok(())
    }

    async fn load_file(&self, path: &Path) -> Result<(), SeedError> {
        if self.endpoint().is_none() {
            return Err(SeedError::NotInitialized);
        }
        let sql = read_sql(path).await?;
        self.record(sql);
        Ok(())
    }

    async fn seed(&self, table_stmts: &[String], index_stmts: &[String]) {
        for stmt in table_stmts.iter().chain(index_stmts) {
            self.record(stmt.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_seeder_requires_init() {
        let seeder = MemorySeeder::new();
        let err = seeder.load_file(Path::new("/tmp/none.sql")).await.unwrap_err();
        assert!(matches!(err, SeedError::NotInitialized));
    }

    #[tokio::test]
    async fn memory_seeder_records_tables_before_indexes() {
        let seeder = MemorySeeder::new();
        seeder.init(&DatabaseEndpoint::default()).await.unwrap();
        seeder
            .seed(
                &["CREATE TABLE a (id INT)".to_string()],
                &["CREATE INDEX a_id ON a (id)".to_string()],
            )
            .await;

        assert_eq!(
            seeder.executed(),
            vec!["CREATE TABLE a (id INT)", "CREATE INDEX a_id ON a (id)"]
        );
    }

    #[tokio::test]
    async fn pg_seeder_rejects_files_before_init() {
        let seeder = PgSeeder::new();
        assert!(seeder.pool().is_none());
        let err = seeder.load_file(Path::new("/tmp/none.sql")).await.unwrap_err();
        assert!(matches!(err, SeedError::NotInitialized));
    }
}
