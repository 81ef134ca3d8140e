//! Post-publish verification against a fullnode read API.

use async_trait::async_trait;

use crate::domain::error::{DeployError, Result};

/// Confirms a published transaction against an authoritative source.
///
/// A verification failure is terminal for the job, exactly like any other
/// stage failure.
#[async_trait]
pub trait TransactionVerifier: Send + Sync {
    async fn verify(&self, node_url: &str, tx_hash: &str) -> Result<()>;
}

/// Verifier backed by the fullnode REST API.
pub struct HttpVerifier {
    client: reqwest::Client,
}

impl HttpVerifier {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionVerifier for HttpVerifier {
    async fn verify(&self, node_url: &str, tx_hash: &str) -> Result<()> {
        let url = format!(
            "{}/transactions/by_hash/{}",
            node_url.trim_end_matches('/'),
            tx_hash
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DeployError::VerificationFailed(format!("transaction lookup failed: {e}")))?;

        if !response.status().is_success() {
            return Err(DeployError::VerificationFailed(format!(
                "transaction {tx_hash} not found (HTTP {})",
                response.status()
            )));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            DeployError::VerificationFailed(format!("unreadable transaction response: {e}"))
        })?;

        match body.get("success").and_then(|v| v.as_bool()) {
            Some(true) => Ok(()),
            Some(false) => {
                let vm_status = body
                    .get("vm_status")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown VM status");
                Err(DeployError::VerificationFailed(format!(
                    "transaction {tx_hash} executed but did not succeed: {vm_status}"
                )))
            }
            // Pending transactions carry no success field yet.
            None => Err(DeployError::VerificationFailed(format!(
                "transaction {tx_hash} is not committed"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::StaticVerifier;

    #[tokio::test]
    async fn test_static_verifier_ok() {
        let verifier = StaticVerifier::ok();
        assert!(verifier
            .verify("http://localhost:8080", "0xabc")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_static_verifier_failure_is_verification_failed() {
        let verifier = StaticVerifier::failing("not on chain");
        let err = verifier
            .verify("http://localhost:8080", "0xabc")
            .await
            .unwrap_err();
        match err {
            DeployError::VerificationFailed(message) => {
                assert!(message.contains("not on chain"));
            }
            other => panic!("expected VerificationFailed, got {other:?}"),
        }
    }
}
