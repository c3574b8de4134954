use async_trait::async_trait;
use axum::Router;

/// What a module gets to see while it is brought up
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// One forward-only schema step. Ids sort lexically within their module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

/// A feature slice of the service.
///
/// Hooks run in this order: `init`, migrations, `start`, then the HTTP
/// server serves `routes` until shutdown, then `stop`.
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name; also the URL segment under `/api/`
    fn name(&self) -> &'static str;

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Routes relative to `/api/{name}`
    fn routes(&self) -> Router {
        Router::new()
    }

    /// OpenAPI fragment with `paths` and `components.schemas`; paths are
    /// relative to the module mount point
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Readiness of the module's dependencies, polled by `/healthz`
    async fn health(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
