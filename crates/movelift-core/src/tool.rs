//! Toolchain presence probing for health reporting.

use std::path::PathBuf;

use serde::Serialize;
use tokio::process::Command;

/// Result of probing for the external toolchain.
#[derive(Debug, Clone, Serialize)]
pub struct ToolchainStatus {
    /// Whether the binary was found on PATH.
    pub found: bool,

    /// Resolved binary path, when found.
    pub path: Option<PathBuf>,

    /// Output of `--version`, when the binary runs.
    pub version: Option<String>,
}

impl ToolchainStatus {
    fn missing() -> Self {
        Self {
            found: false,
            path: None,
            version: None,
        }
    }
}

/// Locate the toolchain binary and ask it for its version.
///
/// Never fails: an unusable toolchain is a reportable state, not an error.
pub async fn probe_toolchain(bin: &str) -> ToolchainStatus {
    let Ok(path) = which::which(bin) else {
        return ToolchainStatus::missing();
    };

    let version = Command::new(&path)
        .arg("--version")
        .output()
        .await
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string());

    ToolchainStatus {
        found: true,
        path: Some(path),
        version,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_probe_missing_binary() {
        let status = probe_toolchain("definitely-not-a-real-binary-name").await;
        assert!(!status.found);
        assert!(status.path.is_none());
        assert!(status.version.is_none());
    }

    #[tokio::test]
    async fn test_probe_present_binary() {
        // `sh` exists on every platform the service targets.
        let status = probe_toolchain("sh").await;
        assert!(status.found);
        assert!(status.path.is_some());
    }
}
