//! Tracing initialisation and job lifecycle emissions.
//!
//! Call [`init_tracing`] once at program start. Lifecycle emissions are
//! `info!` events with stable `event = "…"` fields so they survive log
//! aggregation; the [`JobSpan`] guard tags everything inside a pipeline
//! task with its job id.

use tracing::{info, Level};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

/// Initialise the global tracing subscriber.
///
/// * `json` — when `true`, emit newline-delimited JSON log lines.
/// * `level` — default verbosity when `RUST_LOG` is not set.
///
/// Safe to call multiple times; only the first call takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false))
            .try_init()
            .ok();
    }
}

/// RAII guard that enters a job-scoped tracing span for a pipeline task.
pub struct JobSpan {
    _span: tracing::span::EnteredSpan,
}

impl JobSpan {
    /// Create and enter a span tagged with the job id.
    pub fn enter(job_id: &Uuid) -> Self {
        let span = tracing::info_span!("movelift.job", job_id = %job_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: job submitted with its bundle digest and target network.
pub fn emit_job_submitted(job_id: &Uuid, network: &str, bundle_digest: &str) {
    info!(
        event = "job.submitted",
        job_id = %job_id,
        network = %network,
        bundle_digest = %bundle_digest,
    );
}

/// Emit event: a pipeline stage started.
pub fn emit_stage_started(job_id: &Uuid, stage: &str) {
    info!(event = "job.stage_started", job_id = %job_id, stage = %stage);
}

/// Emit event: job reached a terminal status.
pub fn emit_job_finished(job_id: &Uuid, duration_ms: u64, success: bool) {
    info!(
        event = "job.finished",
        job_id = %job_id,
        duration_ms = duration_ms,
        success = success,
    );
}

/// Emit event: terminal jobs evicted from the registry.
pub fn emit_jobs_evicted(count: usize) {
    info!(event = "registry.evicted", count = count);
}
