//! HTTP server facade for shelf with Axum, error handling, and OpenAPI support.

use std::{collections::BTreeMap, sync::Arc};

use anyhow::Context;
use axum::{http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use shelf_kernel::{settings::Settings, Module, ModuleRegistry};

pub mod error;
pub mod router;

use router::RouterBuilder;

/// Start the HTTP server and serve until a shutdown signal arrives
pub async fn start_server(registry: &ModuleRegistry, settings: &Settings) -> anyhow::Result<()> {
    let address = settings.server.bind_address();
    tracing::info!("starting HTTP server on {}", address);

    let app = build_router(registry, settings);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind to address {address}"))?;

    tracing::info!("HTTP server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Build the main HTTP router with all module routes mounted
pub fn build_router(registry: &ModuleRegistry, settings: &Settings) -> Router {
    let modules: Arc<Vec<Arc<dyn Module>>> = Arc::new(registry.modules().cloned().collect());
    let mut router_builder = RouterBuilder::new().route(
        "/healthz",
        get(move || health_check(modules.clone())),
    );

    for module in registry.modules() {
        let module_name = module.name();
        tracing::info!(
            module = module_name,
            "mounting module routes under /api/{}",
            module_name
        );
        router_builder = router_builder.mount_module(module_name, module.routes());
    }

    router_builder
        .with_openapi(registry)
        .with_timeout(settings.server.request_timeout_ms)
        .with_cors()
        .with_tracing()
        .with_request_id()
        .build()
}

#[derive(Debug, Serialize)]
struct ModuleHealth {
    healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthReport {
    status: &'static str,
    modules: BTreeMap<&'static str, ModuleHealth>,
}

/// 200 when every module reports healthy, 503 otherwise
async fn health_check(modules: Arc<Vec<Arc<dyn Module>>>) -> (StatusCode, Json<HealthReport>) {
    let mut report = HealthReport {
        status: "ok",
        modules: BTreeMap::new(),
    };

    for module in modules.iter() {
        let health = match module.health().await {
            Ok(()) => ModuleHealth {
                healthy: true,
                message: None,
            },
            Err(e) => {
                tracing::error!(module = module.name(), error = %e, "module health check failed");
                report.status = "unavailable";
                ModuleHealth {
                    healthy: false,
                    message: Some(format!("{e:#}")),
                }
            }
        };
        report.modules.insert(module.name(), health);
    }

    let status = if report.status == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http,
    };
    use tower::ServiceExt;

    struct Flaky;

    #[async_trait]
    impl Module for Flaky {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn health(&self) -> anyhow::Result<()> {
            anyhow::bail!("store unreachable")
        }
    }

    #[tokio::test]
    async fn healthz_is_served_with_empty_registry() {
        let router = build_router(&ModuleRegistry::new(), &Settings::default());

        let response = router
            .oneshot(http::Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), http::StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn healthz_reports_unhealthy_module() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(Flaky)).unwrap();
        let router = build_router(&registry, &Settings::default());

        let response = router
            .oneshot(http::Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), http::StatusCode::SERVICE_UNAVAILABLE);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "unavailable");
        assert_eq!(body["modules"]["flaky"]["healthy"], false);
        assert_eq!(body["modules"]["flaky"]["message"], "store unreachable");
    }
}
