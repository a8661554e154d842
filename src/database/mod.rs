use sqlx::postgres::{PgPool, PgPoolOptions};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::info;

pub struct DatabaseManager {
    pub pool: Arc<PgPool>,
}

impl DatabaseManager {
    /// Connects the pool.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!(
            "{:<12} --> pool ready ({} connections max)",
            "Database", max_connections
        );
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub fn get_pool(&self) -> Arc<PgPool> {
        Arc::clone(&self.pool)
    }

    /// Runs `f` inside a transaction, committing on `Ok` and rolling back on `Err`.
    pub async fn transaction<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: for<'c> FnOnce(
            &'c mut sqlx::Transaction<'_, sqlx::Postgres>,
        ) -> Pin<Box<dyn Future<Output = Result<R, E>> + Send + 'c>>,
        E: From<sqlx::Error>,
    {
        let mut tx = self.pool.begin().await?;
        let result = f(&mut tx).await;
        match result {
            Ok(r) => {
                tx.commit().await?;
                Ok(r)
            }
            Err(e) => {
                tx.rollback().await?;
                Err(e)
            }
        }
    }

    /// Applies the embedded schema. Safe to run on every startup.
    pub async fn initialize_database(&self) -> Result<(), sqlx::Error> {
        let create_schema_sql = include_str!("../sql/01-create-schema.sql");
        self.execute_multi_query(create_schema_sql).await?;
        Ok(())
    }

    async fn execute_multi_query(&self, sql: &str) -> Result<(), sqlx::Error> {
        for query in sql.split(';') {
            let query = strip_comments(query);
            if !query.is_empty() {
                sqlx::query(&query).execute(&*self.pool).await?;
            }
        }
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn strip_comments(sql: &str) -> String {
    sql.lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_only_chunks_are_skipped() {
        assert_eq!(strip_comments("\n-- header\n  -- more\n"), "");
        assert_eq!(
            strip_comments("-- note\nCREATE TABLE t (id INT)\n"),
            "CREATE TABLE t (id INT)"
        );
    }

    #[test]
    fn schema_splits_into_statements() {
        let sql = include_str!("../sql/01-create-schema.sql");
        let statements: Vec<String> = sql
            .split(';')
            .map(strip_comments)
            .filter(|s| !s.is_empty())
            .collect();
        assert!(statements.iter().any(|s| s.starts_with("CREATE TABLE IF NOT EXISTS lots")));
        assert!(statements.iter().any(|s| s.starts_with("CREATE TABLE IF NOT EXISTS bids")));
        assert!(statements.iter().all(|s| !s.starts_with("--")));
    }
}
