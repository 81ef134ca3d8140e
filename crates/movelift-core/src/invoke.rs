//! External toolchain invocation with bounded lifetime and captured output.
//!
//! The toolchain is spawned once per call with a discrete argument vector;
//! nothing passes through a shell, so operator-supplied URLs and address
//! strings stay single opaque tokens. Output is forwarded line-by-line into
//! the job log as it arrives.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::config::ENV_PRIVATE_KEY;
use crate::domain::error::{DeployError, Result};

/// Sink for incremental tool output lines.
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn append(&self, line: String);
}

/// Captured output of a completed invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Builtin toolchain commands.
///
/// Compile and publish are always two independent invocations.
#[derive(Debug, Clone)]
pub enum ToolCommand<'a> {
    Compile {
        package_dir: &'a str,
    },
    Publish {
        package_dir: &'a str,
        node_url: &'a str,
        named_addresses: Option<String>,
        resource_account_seed: Option<&'a str>,
    },
}

impl ToolCommand<'_> {
    /// Build the argument vector for this command.
    pub fn args(&self) -> Vec<String> {
        match self {
            ToolCommand::Compile { package_dir } => vec![
                "move".to_string(),
                "compile".to_string(),
                "--package-dir".to_string(),
                package_dir.to_string(),
            ],
            ToolCommand::Publish {
                package_dir,
                node_url,
                named_addresses,
                resource_account_seed,
            } => {
                let mut args = vec![
                    "move".to_string(),
                    "publish".to_string(),
                    "--package-dir".to_string(),
                    package_dir.to_string(),
                    "--assume-yes".to_string(),
                    "--url".to_string(),
                    node_url.to_string(),
                ];
                if let Some(named) = named_addresses {
                    args.push("--named-addresses".to_string());
                    args.push(named.clone());
                }
                if let Some(seed) = resource_account_seed {
                    args.push("--resource-account-seed".to_string());
                    args.push(seed.to_string());
                }
                args
            }
        }
    }
}

/// Runs the external toolchain as a child process.
pub struct ToolInvoker {
    bin: String,
    timeout: Duration,
}

impl ToolInvoker {
    pub fn new(bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }

    /// Environment entry carrying the signing key to a publish invocation.
    ///
    /// The key travels only through the child's environment, never argv.
    pub fn signing_env(key: &str) -> (String, String) {
        (ENV_PRIVATE_KEY.to_string(), key.to_string())
    }

    /// Run the tool once with the given argument vector.
    ///
    /// Both output streams are read concurrently and forwarded to `sink`
    /// line-by-line as they are produced. The wall-clock timeout covers the
    /// whole invocation; on expiry the child is force-killed and the call
    /// fails with [`DeployError::ToolTimeout`], distinct from a non-zero
    /// exit.
    pub async fn run(
        &self,
        args: &[String],
        envs: &[(String, String)],
        sink: &dyn LogSink,
    ) -> Result<ToolOutput> {
        let mut cmd = Command::new(&self.bin);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (name, value) in envs {
            cmd.env(name, value);
        }

        let mut child = cmd.spawn().map_err(|e| DeployError::SpawnFailure {
            tool: self.bin.clone(),
            source: e,
        })?;

        let mut stdout_reader = child
            .stdout
            .take()
            .map(|stream| BufReader::new(stream).lines());
        let mut stderr_reader = child
            .stderr
            .take()
            .map(|stream| BufReader::new(stream).lines());

        let mut stdout_done = stdout_reader.is_none();
        let mut stderr_done = stderr_reader.is_none();
        let mut stdout_buf = String::new();
        let mut stderr_buf = String::new();

        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        while !stdout_done || !stderr_done {
            tokio::select! {
                _ = &mut deadline => {
                    let _ = child.kill().await;
                    return Err(DeployError::ToolTimeout {
                        tool: self.bin.clone(),
                        secs: self.timeout.as_secs(),
                    });
                }
                line = async {
                    match stdout_reader.as_mut() {
                        Some(reader) => reader.next_line().await,
                        None => std::future::pending().await,
                    }
                }, if !stdout_done => {
                    match line {
                        Ok(Some(line)) => {
                            stdout_buf.push_str(&line);
                            stdout_buf.push('\n');
                            sink.append(line).await;
                        }
                        Ok(None) => stdout_done = true,
                        Err(_) => stdout_done = true,
                    }
                }
                line = async {
                    match stderr_reader.as_mut() {
                        Some(reader) => reader.next_line().await,
                        None => std::future::pending().await,
                    }
                }, if !stderr_done => {
                    match line {
                        Ok(Some(line)) => {
                            stderr_buf.push_str(&line);
                            stderr_buf.push('\n');
                            sink.append(format!("[stderr] {line}")).await;
                        }
                        Ok(None) => stderr_done = true,
                        Err(_) => stderr_done = true,
                    }
                }
            }
        }

        // Streams are closed; the exit itself stays under the same deadline.
        let status = tokio::select! {
            _ = &mut deadline => {
                let _ = child.kill().await;
                return Err(DeployError::ToolTimeout {
                    tool: self.bin.clone(),
                    secs: self.timeout.as_secs(),
                });
            }
            status = child.wait() => status?,
        };

        if !status.success() {
            return Err(DeployError::ToolFailure {
                tool: self.bin.clone(),
                code: status.code().unwrap_or(-1),
                stderr: stderr_buf,
            });
        }

        Ok(ToolOutput {
            stdout: stdout_buf,
            stderr: stderr_buf,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::MemorySink;

    #[test]
    fn test_compile_args() {
        let args = ToolCommand::Compile {
            package_dir: "/work/pkg",
        }
        .args();
        assert_eq!(args[0], "move");
        assert_eq!(args[1], "compile");
        assert!(args.contains(&"--package-dir".to_string()));
        assert!(args.contains(&"/work/pkg".to_string()));
    }

    #[test]
    fn test_publish_args_keep_values_as_single_tokens() {
        let cmd = ToolCommand::Publish {
            package_dir: "/work/pkg",
            node_url: "https://fullnode.devnet.aptoslabs.com/v1",
            named_addresses: Some("counter=0xcafe,std=0x1".to_string()),
            resource_account_seed: Some("seed with spaces"),
        };
        let args = cmd.args();
        assert!(args.contains(&"--assume-yes".to_string()));
        // Each operator-supplied value is one argv token, unsplit.
        assert!(args.contains(&"counter=0xcafe,std=0x1".to_string()));
        assert!(args.contains(&"seed with spaces".to_string()));
        // The signing key never appears in argv.
        assert!(!args.iter().any(|a| a.contains("PRIVATE")));
    }

    #[test]
    fn test_publish_args_omit_optional_flags() {
        let cmd = ToolCommand::Publish {
            package_dir: "/work/pkg",
            node_url: "http://localhost:8080",
            named_addresses: None,
            resource_account_seed: None,
        };
        let args = cmd.args();
        assert!(!args.contains(&"--named-addresses".to_string()));
        assert!(!args.contains(&"--resource-account-seed".to_string()));
    }

    #[tokio::test]
    async fn test_run_captures_and_streams_stdout() {
        let invoker = ToolInvoker::new("echo", Duration::from_secs(10));
        let sink = MemorySink::new();

        let output = invoker
            .run(&["hello".to_string(), "world".to_string()], &[], &sink)
            .await
            .expect("echo failed");

        assert_eq!(output.stdout, "hello world\n");
        assert_eq!(sink.lines(), vec!["hello world".to_string()]);
    }

    #[tokio::test]
    async fn test_run_reports_nonzero_exit() {
        let invoker = ToolInvoker::new("false", Duration::from_secs(10));
        let sink = MemorySink::new();

        let err = invoker.run(&[], &[], &sink).await.unwrap_err();
        match err {
            DeployError::ToolFailure { code, .. } => assert_ne!(code, 0),
            other => panic!("expected ToolFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_reports_spawn_failure() {
        let invoker = ToolInvoker::new(
            "/nonexistent-binary-that-does-not-exist",
            Duration::from_secs(10),
        );
        let sink = MemorySink::new();

        let err = invoker.run(&[], &[], &sink).await.unwrap_err();
        assert!(matches!(err, DeployError::SpawnFailure { .. }));
    }

    #[tokio::test]
    async fn test_run_kills_on_timeout() {
        let invoker = ToolInvoker::new("sleep", Duration::from_millis(200));
        let sink = MemorySink::new();

        let start = std::time::Instant::now();
        let err = invoker.run(&["30".to_string()], &[], &sink).await.unwrap_err();

        assert!(matches!(err, DeployError::ToolTimeout { .. }));
        // Force-kill, not a full 30s wait.
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_run_passes_environment() {
        let invoker = ToolInvoker::new("sh", Duration::from_secs(10));
        let sink = MemorySink::new();

        let output = invoker
            .run(
                &["-c".to_string(), "printf %s \"$MOVELIFT_TEST_VALUE\"".to_string()],
                &[("MOVELIFT_TEST_VALUE".to_string(), "from-env".to_string())],
                &sink,
            )
            .await
            .expect("sh failed");

        assert_eq!(output.stdout.trim(), "from-env");
    }
}
