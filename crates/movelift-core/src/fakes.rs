//! Test doubles for the pipeline's trait seams.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::error::{DeployError, Result};
use crate::invoke::LogSink;
use crate::verify::TransactionVerifier;

/// In-memory log sink recording appended lines.
#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("sink lock").clone()
    }
}

#[async_trait]
impl LogSink for MemorySink {
    async fn append(&self, line: String) {
        self.lines.lock().expect("sink lock").push(line);
    }
}

/// Verifier with a fixed outcome.
pub struct StaticVerifier {
    failure: Option<String>,
}

impl StaticVerifier {
    /// A verifier that accepts every transaction.
    pub fn ok() -> Self {
        Self { failure: None }
    }

    /// A verifier that rejects every transaction with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
        }
    }
}

#[async_trait]
impl TransactionVerifier for StaticVerifier {
    async fn verify(&self, _node_url: &str, _tx_hash: &str) -> Result<()> {
        match &self.failure {
            None => Ok(()),
            Some(message) => Err(DeployError::VerificationFailed(message.clone())),
        }
    }
}
