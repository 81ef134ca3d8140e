//! Request handlers: submission, status query, health probe.
//!
//! Handlers are thin: they validate and shape the request, then delegate to
//! the core pipeline. The final deployment result is never returned
//! synchronously; callers poll the job endpoint.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use movelift_core::{probe_toolchain, DeployOptions, Job};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// Multipart field carrying the archive bytes.
const PACKAGE_FIELD: &str = "move_package";

/// `POST /api/deploy` — accept an archive and queue a deployment job.
pub async fn deploy(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut archive: Option<(Vec<u8>, String)> = None;
    let mut options = DeployOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        match field.name().unwrap_or_default() {
            PACKAGE_FIELD => {
                let name = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| "package.bin".to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;
                archive = Some((bytes.to_vec(), name));
            }
            "network" => {
                let text = read_text_field(field).await?;
                options.network = text
                    .parse()
                    .map_err(ApiError::from)?;
            }
            "named_addresses" => {
                let text = read_text_field(field).await?;
                if !text.trim().is_empty() {
                    options.named_addresses = DeployOptions::parse_named_addresses(&text)
                        .map_err(ApiError::from)?;
                }
            }
            "publish_mode" => {
                let text = read_text_field(field).await?;
                options.publish_mode = text
                    .parse()
                    .map_err(ApiError::from)?;
            }
            "resource_account_seed" => {
                options.resource_account_seed = Some(read_text_field(field).await?);
            }
            // Unknown fields are ignored rather than rejected.
            _ => {}
        }
    }

    let (bytes, name) =
        archive.ok_or_else(|| ApiError::BadRequest(format!("missing {PACKAGE_FIELD} upload")))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("uploaded archive is empty".to_string()));
    }

    let job_id = state.pipeline.submit(bytes, name, options).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "job_id": job_id }))))
}

/// `GET /api/jobs/{id}` — snapshot a job's status, log, and outcome.
pub async fn job_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::BadRequest(format!("invalid job id: {id}")))?;
    let job = state
        .pipeline
        .registry()
        .snapshot(&id)
        .await
        .ok_or(ApiError::NotFound(id))?;
    Ok(Json(job))
}

/// `GET /api/health` — toolchain and configuration probe.
///
/// Degraded when any sub-check fails; each sub-check is reported so the
/// operator can see which one.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let toolchain = probe_toolchain(&state.config.aptos_bin).await;
    let signer_configured = state.config.private_key.is_some();
    let degraded = !toolchain.found || !signer_configured;

    Json(json!({
        "status": if degraded { "degraded" } else { "ok" },
        "version": movelift_core::VERSION,
        "cli": {
            "found": toolchain.found,
            "version": toolchain.version,
        },
        "signer_configured": signer_configured,
    }))
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("unreadable form field: {e}")))
}
