//! Movelift HTTP service.
//!
//! A thin collaborator around `movelift-core`: submission, status query,
//! and health probe. Everything that matters happens in the core pipeline;
//! this crate validates requests, shapes responses, and owns the listener.

pub mod error;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use movelift_core::{Config, DeployPipeline, HttpVerifier, JobRegistry};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The deployment pipeline (and, through it, the job registry).
    pub pipeline: DeployPipeline,

    /// Service configuration.
    pub config: Config,
}

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    let upload_cap = state.config.max_upload_bytes as usize;
    Router::new()
        .route("/api/deploy", post(routes::deploy))
        .route("/api/jobs/{id}", get(routes::job_status))
        .route("/api/health", get(routes::health))
        .layer(DefaultBodyLimit::max(upload_cap))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Periodically evict terminal jobs past their retention TTL.
///
/// The sweep interval is a quarter of the TTL, floored at 30 seconds so a
/// short TTL cannot turn the sweeper into a busy loop.
pub fn spawn_eviction_sweeper(
    registry: JobRegistry,
    ttl: Duration,
) -> tokio::task::JoinHandle<()> {
    let period = (ttl / 4).max(Duration::from_secs(30));
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(period);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            let evicted = registry.evict_expired(ttl).await;
            if evicted > 0 {
                movelift_core::obs::emit_jobs_evicted(evicted);
            }
        }
    })
}

/// Bind and serve the deployment API until the process exits.
pub async fn serve(addr: SocketAddr, config: Config) -> anyhow::Result<()> {
    let registry = JobRegistry::new();
    let pipeline = DeployPipeline::new(
        config.clone(),
        registry.clone(),
        Arc::new(HttpVerifier::new()),
    );
    spawn_eviction_sweeper(registry, config.job_ttl);

    let router = app(AppState { pipeline, config });
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "movelift server listening");
    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use movelift_core::fakes::StaticVerifier;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let config = Config {
            work_root: std::env::temp_dir().join("movelift-server-tests"),
            ..Config::default()
        };
        let pipeline = DeployPipeline::new(
            config.clone(),
            JobRegistry::new(),
            Arc::new(StaticVerifier::ok()),
        );
        AppState { pipeline, config }
    }

    #[tokio::test]
    async fn test_health_reports_degraded_without_signer() {
        let response = app(test_state())
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        // No signing key in the test config, so the probe is degraded.
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["signer_configured"], false);
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let response = app(test_state())
            .oneshot(
                Request::builder()
                    .uri(format!("/api/jobs/{}", uuid::Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_garbage_job_id_is_bad_request() {
        let response = app(test_state())
            .oneshot(
                Request::builder()
                    .uri("/api/jobs/not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_deploy_without_package_is_bad_request() {
        let body = concat!(
            "--boundary\r\n",
            "Content-Disposition: form-data; name=\"network\"\r\n\r\n",
            "devnet\r\n",
            "--boundary--\r\n",
        );
        let response = app(test_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/deploy")
                    .header(
                        header::CONTENT_TYPE,
                        "multipart/form-data; boundary=boundary",
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_deploy_with_invalid_network_is_bad_request() {
        let body = concat!(
            "--boundary\r\n",
            "Content-Disposition: form-data; name=\"network\"\r\n\r\n",
            "moonnet\r\n",
            "--boundary\r\n",
            "Content-Disposition: form-data; name=\"move_package\"; filename=\"demo.zip\"\r\n",
            "Content-Type: application/zip\r\n\r\n",
            "PK\r\n",
            "--boundary--\r\n",
        );
        let response = app(test_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/deploy")
                    .header(
                        header::CONTENT_TYPE,
                        "multipart/form-data; boundary=boundary",
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
