//! Job lifecycle and state tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::request::Network;

/// Status of a deployment job.
///
/// The variants are declared in pipeline order; a job's status only ever
/// advances through this sequence, never regresses. `Succeeded` and `Failed`
/// are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Extracting,
    Validating,
    Compiling,
    Publishing,
    Verifying,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Get the status name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Extracting => "extracting",
            JobStatus::Validating => "validating",
            JobStatus::Compiling => "compiling",
            JobStatus::Publishing => "publishing",
            JobStatus::Verifying => "verifying",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// A single timestamped line in a job's progress log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogLine {
    /// When the line was appended.
    pub timestamp: DateTime<Utc>,

    /// The line text.
    pub line: String,
}

/// Structured outcome of a successful publish.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishOutcome {
    /// Transaction hash reported by the toolchain.
    pub tx_hash: String,

    /// Published addresses, deduplicated in first-seen order. The
    /// transaction hash itself is not repeated here.
    pub addresses: Vec<String>,

    /// Module names mentioned in the publish output.
    pub modules: Vec<String>,

    /// Network the package was published to.
    pub network: Network,

    /// Explorer link for the transaction.
    pub explorer_url: String,
}

/// Failure details for a terminal failed job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobError {
    /// Human-readable failure message.
    pub message: String,

    /// Captured standard-error text of the failing stage, where available.
    pub stderr: Option<String>,
}

/// A single deployment job.
///
/// Mutated only by the orchestrator and the stage currently running; read
/// concurrently by status queries. `result` and `error` are mutually
/// exclusive and each is set at most once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    /// Unique identifier, assigned at submission.
    pub id: Uuid,

    /// Current pipeline status.
    pub status: JobStatus,

    /// When the job was submitted.
    pub created_at: DateTime<Utc>,

    /// When the job reached a terminal status (None while running).
    pub finished_at: Option<DateTime<Utc>>,

    /// SHA-256 digest of the uploaded archive bytes.
    pub bundle_digest: String,

    /// Append-only progress log, in emission order.
    pub log: Vec<LogLine>,

    /// Publish outcome, present only when `status` is `Succeeded`.
    pub result: Option<PublishOutcome>,

    /// Failure details, present only when `status` is `Failed`.
    pub error: Option<JobError>,
}

impl Job {
    /// Create a new pending job for an uploaded bundle.
    pub fn new(bundle_digest: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            created_at: Utc::now(),
            finished_at: None,
            bundle_digest,
            log: Vec::new(),
            result: None,
            error: None,
        }
    }

    /// Append a timestamped line to the progress log.
    pub fn append_log(&mut self, line: impl Into<String>) {
        self.log.push(LogLine {
            timestamp: Utc::now(),
            line: line.into(),
        });
    }

    /// Advance to `next`, returning whether the transition was applied.
    ///
    /// Transitions that would regress, repeat the current status, or leave a
    /// terminal status are rejected.
    pub fn advance(&mut self, next: JobStatus) -> bool {
        if self.status.is_terminal() || next <= self.status {
            return false;
        }
        self.status = next;
        true
    }

    /// Finalize as succeeded with a publish outcome.
    pub fn finish_ok(&mut self, outcome: PublishOutcome) -> bool {
        if self.status.is_terminal() || self.result.is_some() || self.error.is_some() {
            return false;
        }
        self.status = JobStatus::Succeeded;
        self.finished_at = Some(Utc::now());
        self.result = Some(outcome);
        true
    }

    /// Finalize as failed with a message and optional captured stderr.
    pub fn finish_err(&mut self, message: impl Into<String>, stderr: Option<String>) -> bool {
        if self.status.is_terminal() || self.result.is_some() || self.error.is_some() {
            return false;
        }
        self.status = JobStatus::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(JobError {
            message: message.into(),
            stderr,
        });
        true
    }
}
