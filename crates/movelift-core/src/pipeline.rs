//! Deployment pipeline orchestration.
//!
//! `submit` registers a job and returns immediately; the stage sequence
//! runs on a detached task against a job-private work directory. Any stage
//! failure is terminal for the job, and the work directory is reclaimed on
//! every exit path by the [`WorkDir`] guard.

use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;
use uuid::Uuid;

use crate::config::Config;
use crate::digest;
use crate::domain::error::Result;
use crate::domain::job::{Job, JobStatus, PublishOutcome};
use crate::domain::request::DeployOptions;
use crate::extract;
use crate::invoke::{ToolCommand, ToolInvoker};
use crate::manifest;
use crate::obs;
use crate::parse;
use crate::registry::{JobLogger, JobRegistry};
use crate::verify::TransactionVerifier;
use crate::workdir::WorkDir;

/// Orchestrates deployment jobs end to end.
#[derive(Clone)]
pub struct DeployPipeline {
    config: Config,
    registry: JobRegistry,
    verifier: Arc<dyn TransactionVerifier>,
}

impl DeployPipeline {
    pub fn new(
        config: Config,
        registry: JobRegistry,
        verifier: Arc<dyn TransactionVerifier>,
    ) -> Self {
        Self {
            config,
            registry,
            verifier,
        }
    }

    /// The registry this pipeline writes into.
    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Register a job for the uploaded archive and schedule its pipeline.
    ///
    /// Returns as soon as the job is queued; no stage work happens on the
    /// caller's path. Option validation failures surface here and never
    /// create a job.
    pub async fn submit(
        &self,
        archive: Vec<u8>,
        original_name: String,
        options: DeployOptions,
    ) -> Result<Uuid> {
        options.validate()?;

        let bundle_digest = digest::bundle_digest(&archive);
        let job = Job::new(bundle_digest.clone());
        let id = job.id;
        self.registry.insert(job).await;
        obs::emit_job_submitted(&id, options.network.name(), &bundle_digest);

        let pipeline = self.clone();
        let job_span = tracing::info_span!("movelift.job", job_id = %id);
        tokio::spawn(
            async move {
                pipeline.run_job(id, archive, original_name, options).await;
            }
            .instrument(job_span),
        );

        Ok(id)
    }

    async fn run_job(
        &self,
        id: Uuid,
        archive: Vec<u8>,
        original_name: String,
        options: DeployOptions,
    ) {
        let started = Instant::now();

        match self.execute(id, archive, original_name, &options).await {
            Ok(outcome) => {
                self.registry
                    .append_log(&id, "Deployment completed successfully")
                    .await;
                self.registry.finish_ok(&id, outcome).await;
                obs::emit_job_finished(&id, started.elapsed().as_millis() as u64, true);
            }
            Err(err) => {
                let stderr = err.captured_stderr().map(str::to_string);
                self.registry.append_log(&id, format!("Error: {err}")).await;
                self.registry.finish_err(&id, err.to_string(), stderr).await;
                obs::emit_job_finished(&id, started.elapsed().as_millis() as u64, false);
            }
        }
    }

    /// Run the stage sequence for one job.
    ///
    /// The work directory guard created here is dropped on every return
    /// path, so the scratch area is gone by the time the job's terminal
    /// status becomes observable.
    async fn execute(
        &self,
        id: Uuid,
        archive: Vec<u8>,
        original_name: String,
        options: &DeployOptions,
    ) -> Result<PublishOutcome> {
        let work = WorkDir::create(&self.config.work_root, &id)?;
        let log = JobLogger::new(self.registry.clone(), id);

        self.enter_stage(&id, JobStatus::Extracting).await;
        log.append("Extracting package...").await;
        let archive_path = work.archive_path();
        tokio::fs::write(&archive_path, &archive).await?;
        let package_dir = work.package_dir();
        extract::extract_archive_async(archive_path, original_name, package_dir.clone()).await?;
        log.append("Package extracted").await;

        self.enter_stage(&id, JobStatus::Validating).await;
        log.append("Validating package structure...").await;
        let package_root = manifest::validate_package_async(package_dir.clone()).await?;
        let shown_root = package_root
            .strip_prefix(&package_dir)
            .unwrap_or(&package_root);
        log.append(format!(
            "Found {} under {}",
            manifest::MANIFEST_FILE,
            if shown_root.as_os_str().is_empty() {
                "package root".to_string()
            } else {
                shown_root.display().to_string()
            }
        ))
        .await;

        if !options.named_addresses.is_empty() {
            log.append("Merging named addresses...").await;
            manifest::merge_named_addresses_async(
                package_root.join(manifest::MANIFEST_FILE),
                options.named_addresses.clone(),
            )
            .await?;
            log.append(format!(
                "Named addresses updated: {}",
                options
                    .named_addresses
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
            .await;
        }

        let invoker = ToolInvoker::new(self.config.aptos_bin.clone(), self.config.job_timeout);
        let package_root_arg = package_root.to_string_lossy().to_string();

        self.enter_stage(&id, JobStatus::Compiling).await;
        log.append("Compiling Move package...").await;
        let compile = ToolCommand::Compile {
            package_dir: &package_root_arg,
        };
        invoker.run(&compile.args(), &[], &log).await?;
        log.append("Compilation successful").await;

        self.enter_stage(&id, JobStatus::Publishing).await;
        log.append(format!("Publishing package to {}...", options.network))
            .await;
        let node_url = self.config.node_url(options.network);
        let signing_env = ToolInvoker::signing_env(self.config.signing_key()?);
        let publish = ToolCommand::Publish {
            package_dir: &package_root_arg,
            node_url: &node_url,
            named_addresses: options.named_addresses_arg(),
            resource_account_seed: options.resource_account_seed.as_deref(),
        };
        let output = invoker.run(&publish.args(), &[signing_env], &log).await?;

        let parsed = parse::parse_publish_output(&output.stdout)?;
        let outcome = PublishOutcome {
            explorer_url: options.network.explorer_url(&parsed.tx_hash),
            tx_hash: parsed.tx_hash,
            addresses: parsed.addresses,
            modules: parsed.modules,
            network: options.network,
        };
        log.append(format!("Publication submitted. tx: {}", outcome.tx_hash))
            .await;

        self.enter_stage(&id, JobStatus::Verifying).await;
        log.append("Verifying transaction on chain...").await;
        self.verifier.verify(&node_url, &outcome.tx_hash).await?;
        log.append("Transaction verified").await;

        Ok(outcome)
    }

    async fn enter_stage(&self, id: &Uuid, status: JobStatus) {
        self.registry.advance_status(id, status).await;
        obs::emit_stage_started(id, status.name());
    }
}
