//! PostgreSQL pool factory and the migration runner that applies the
//! migrations contributed by modules.

use std::time::Duration;

use anyhow::Context;
use shelf_kernel::{settings::DatabaseSettings, Migration};
use sqlx::{postgres::PgPoolOptions, PgPool};

const CONNECT_ATTEMPTS: u32 = 3;
const BASE_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Open a connection pool, retrying with exponential backoff.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<PgPool> {
    let mut attempt = 0;

    loop {
        let result = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .connect(&settings.url)
            .await;

        match result {
            Ok(pool) => {
                tracing::info!(
                    target: "shelf-db",
                    url = %settings.redacted_url(),
                    max_connections = settings.max_connections,
                    "database pool created"
                );
                return Ok(pool);
            }
            Err(e) => {
                attempt += 1;
                if attempt >= CONNECT_ATTEMPTS {
                    return Err(e).with_context(|| {
                        format!(
                            "failed to connect to database at '{}' after {} attempts",
                            settings.redacted_url(),
                            attempt
                        )
                    });
                }

                let delay = retry_delay(attempt);
                tracing::warn!(
                    target: "shelf-db",
                    attempt,
                    error = %e,
                    "database connection failed, retrying in {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

fn retry_delay(attempt: u32) -> Duration {
    BASE_RETRY_DELAY * 2_u32.pow(attempt.saturating_sub(1))
}

/// Apply every migration that is not yet recorded in `schema_migrations`.
///
/// Each migration runs in its own transaction together with its bookkeeping
/// row. Returns the number of migrations applied by this call.
pub async fn migrate(pool: &PgPool, migrations: &[(String, Migration)]) -> anyhow::Result<usize> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            module      TEXT        NOT NULL,
            id          TEXT        NOT NULL,
            applied_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            PRIMARY KEY (module, id)
        )",
    )
    .execute(pool)
    .await
    .context("failed to create schema_migrations table")?;

    let mut applied = 0;

    for (module, migration) in migrations {
        let already: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM schema_migrations WHERE module = $1 AND id = $2")
                .bind(module)
                .bind(migration.id)
                .fetch_optional(pool)
                .await
                .with_context(|| format!("failed to check migration {module}/{}", migration.id))?;

        if already.is_some() {
            tracing::debug!(target: "shelf-db", %module, id = migration.id, "migration already applied");
            continue;
        }

        let mut tx = pool.begin().await.context("failed to open transaction")?;

        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("migration {module}/{} failed", migration.id))?;

        sqlx::query("INSERT INTO schema_migrations (module, id) VALUES ($1, $2)")
            .bind(module)
            .bind(migration.id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to record migration {module}/{}", migration.id))?;

        tx.commit()
            .await
            .with_context(|| format!("failed to commit migration {module}/{}", migration.id))?;

        tracing::info!(target: "shelf-db", %module, id = migration.id, "migration applied");
        applied += 1;
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_doubles() {
        assert_eq!(retry_delay(1), Duration::from_millis(500));
        assert_eq!(retry_delay(2), Duration::from_millis(1000));
        assert_eq!(retry_delay(3), Duration::from_millis(2000));
    }

    /// Runs only when `SHELF_TEST_DATABASE_URL` points at a disposable database.
    #[tokio::test]
    async fn migrate_is_idempotent() {
        let Ok(url) = std::env::var("SHELF_TEST_DATABASE_URL") else {
            return;
        };
        let settings = DatabaseSettings {
            url,
            ..DatabaseSettings::default()
        };
        let pool = connect(&settings).await.unwrap();
        let migrations = vec![(
            "db_test".to_string(),
            Migration {
                id: "001_probe",
                up: "CREATE TABLE IF NOT EXISTS shelf_db_probe (id INT);",
            },
        )];

        migrate(&pool, &migrations).await.unwrap();
        assert_eq!(migrate(&pool, &migrations).await.unwrap(), 0);
    }
}
