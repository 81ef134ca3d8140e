//! Movelift Core Library
//!
//! Deployment pipeline for Move packages: sandboxed archive extraction,
//! manifest rewriting, bounded toolchain invocation, publish-output parsing,
//! and asynchronous job orchestration.

pub mod config;
pub mod digest;
pub mod domain;
pub mod extract;
pub mod fakes;
pub mod invoke;
pub mod manifest;
pub mod obs;
pub mod parse;
pub mod pipeline;
pub mod registry;
pub mod tool;
pub mod verify;
pub mod workdir;

pub use config::Config;
pub use domain::{
    DeployError, DeployOptions, Job, JobError, JobStatus, LogLine, Network, PublishMode,
    PublishOutcome, Result,
};
pub use extract::{extract_archive, ArchiveFormat};
pub use invoke::{LogSink, ToolCommand, ToolInvoker, ToolOutput};
pub use manifest::{locate_manifest, merge_named_addresses, validate_package};
pub use obs::init_tracing;
pub use parse::{parse_publish_output, ParsedPublish};
pub use pipeline::DeployPipeline;
pub use registry::{JobLogger, JobRegistry};
pub use tool::{probe_toolchain, ToolchainStatus};
pub use verify::{HttpVerifier, TransactionVerifier};
pub use workdir::WorkDir;

/// Movelift version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
