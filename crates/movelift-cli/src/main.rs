//! Movelift - Move package deployment CLI
//!
//! The `movelift` command drives the deployment pipeline from a terminal.
//!
//! ## Commands
//!
//! - `serve`: run the HTTP deployment service
//! - `deploy`: run a one-shot deployment of a local archive
//! - `doctor`: report toolchain and configuration health

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use movelift_core::{
    init_tracing, probe_toolchain, Config, DeployOptions, DeployPipeline, HttpVerifier,
    JobRegistry, JobStatus, PublishMode,
};
use tracing::Level;

#[derive(Parser)]
#[command(name = "movelift")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Move package deployment service", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP deployment service
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:3000", env = "MOVELIFT_ADDR")]
        addr: SocketAddr,
    },

    /// Deploy a local package archive and wait for the outcome
    Deploy {
        /// Path to the packaged bundle (.zip, .tar, or .tar.gz)
        archive: PathBuf,

        /// Target network
        #[arg(short, long, default_value = "devnet")]
        network: String,

        /// Named address bindings as a JSON object, e.g. '{"counter":"0xcafe"}'
        #[arg(long)]
        named_addresses: Option<String>,

        /// Publish under a seeded resource account instead of the signer
        #[arg(long)]
        resource_account_seed: Option<String>,
    },

    /// Report toolchain and configuration health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::Serve { addr } => movelift_server::serve(addr, Config::from_env()).await,
        Commands::Deploy {
            archive,
            network,
            named_addresses,
            resource_account_seed,
        } => deploy(archive, network, named_addresses, resource_account_seed).await,
        Commands::Doctor => doctor().await,
    }
}

async fn deploy(
    archive: PathBuf,
    network: String,
    named_addresses: Option<String>,
    resource_account_seed: Option<String>,
) -> Result<()> {
    let config = Config::from_env();

    let mut options = DeployOptions {
        network: network.parse()?,
        resource_account_seed,
        ..DeployOptions::default()
    };
    if options.resource_account_seed.is_some() {
        options.publish_mode = PublishMode::ResourceAccount;
    }
    if let Some(json) = named_addresses {
        options.named_addresses = DeployOptions::parse_named_addresses(&json)?;
    }

    let original_name = archive
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "package.bin".to_string());
    let bytes = tokio::fs::read(&archive)
        .await
        .with_context(|| format!("failed to read {}", archive.display()))?;

    let registry = JobRegistry::new();
    let pipeline = DeployPipeline::new(config, registry.clone(), Arc::new(HttpVerifier::new()));
    let id = pipeline.submit(bytes, original_name, options).await?;
    println!("job {id} queued");

    // Tail the job log until the pipeline reaches a terminal status.
    let mut printed = 0usize;
    let job = loop {
        let job = registry
            .snapshot(&id)
            .await
            .context("job vanished from the registry")?;
        for line in &job.log[printed..] {
            println!("  {}", line.line);
        }
        printed = job.log.len();
        if job.status.is_terminal() {
            break job;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    };

    match job.status {
        JobStatus::Succeeded => {
            let result = job.result.context("succeeded job carries a result")?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        _ => {
            let error = job.error.context("failed job carries an error")?;
            if let Some(stderr) = &error.stderr {
                eprintln!("{stderr}");
            }
            anyhow::bail!("deployment failed: {}", error.message);
        }
    }
}

async fn doctor() -> Result<()> {
    let config = Config::from_env();

    let toolchain = probe_toolchain(&config.aptos_bin).await;
    match (&toolchain.path, &toolchain.version) {
        (Some(path), Some(version)) => {
            println!("toolchain: {} ({})", version, path.display());
        }
        (Some(path), None) => {
            println!(
                "toolchain: found at {} but --version failed",
                path.display()
            );
        }
        _ => println!("toolchain: NOT FOUND ({} is not on PATH)", config.aptos_bin),
    }

    println!(
        "signing key: {}",
        if config.private_key.is_some() {
            "configured"
        } else {
            "MISSING (set MOVELIFT_PRIVATE_KEY)"
        }
    );
    println!("work root: {}", config.work_root.display());
    println!("job timeout: {}s", config.job_timeout.as_secs());

    let healthy = toolchain.found && config.private_key.is_some();
    if !healthy {
        anyhow::bail!("environment is not ready for deployments");
    }
    Ok(())
}
