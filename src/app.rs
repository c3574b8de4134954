//! Process bootstrap shared by `shelf-app` and the `shelf` CLI.

use std::sync::Arc;

use anyhow::{bail, Context};
use shelf_kernel::{
    settings::{Settings, StoreBackend},
    InitCtx, ModuleRegistry,
};
use sqlx::PgPool;

use crate::modules::{
    self,
    books::store::{BookStore, InMemoryBookStore, PostgresBookStore},
};

/// Book store selected by configuration, plus the pool when it is database-backed.
pub async fn open_store(settings: &Settings) -> anyhow::Result<(Arc<dyn BookStore>, Option<PgPool>)> {
    match settings.database.backend {
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory book store; data is lost on exit");
            Ok((Arc::new(InMemoryBookStore::new()), None))
        }
        StoreBackend::Postgres => {
            let pool = shelf_db::connect(&settings.database).await?;
            Ok((Arc::new(PostgresBookStore::new(pool.clone())), Some(pool)))
        }
    }
}

pub fn build_registry(
    settings: &Settings,
    book_store: Arc<dyn BookStore>,
) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, settings, book_store)
        .context("failed to register modules")?;
    Ok(registry)
}

/// Run the API until a shutdown signal, then stop modules in reverse order.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    let (book_store, pool) = open_store(&settings).await?;
    let registry = build_registry(&settings, book_store)?;
    let ctx = InitCtx {
        settings: &settings,
    };

    registry.init_modules(&ctx).await?;

    if let Some(pool) = &pool {
        if settings.database.run_migrations {
            let applied = shelf_db::migrate(pool, &registry.collect_migrations()).await?;
            tracing::info!(applied, "database schema up to date");
        }
    }

    registry.start_modules(&ctx).await?;

    let served = shelf_http::start_server(&registry, &settings).await;

    registry.stop_modules().await?;
    if let Some(pool) = pool {
        pool.close().await;
    }

    served
}

/// Apply pending migrations and return how many ran.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    if settings.database.backend != StoreBackend::Postgres {
        bail!("migrations need the postgres backend; set database.backend = \"postgres\"");
    }

    let (book_store, pool) = open_store(settings).await?;
    let registry = build_registry(settings, book_store)?;
    let pool = pool.context("postgres backend did not yield a pool")?;

    let applied = shelf_db::migrate(&pool, &registry.collect_migrations()).await?;
    pool.close().await;
    Ok(applied)
}
