//! # forger-core
//!
//! Template materialization engine for the Forger CLI:
//! - Copy-task manifests built through a typed builder
//! - Deterministic placeholder substitution
//! - Pluggable template sources (S3, local directory, in-memory)
//! - Bounded-concurrency, fail-soft materialization with per-task reports
//!
//! # Example
//!
//! ```no_run
//! use forger_core::{CopyTask, Manifest, Materializer, MemorySource};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = Arc::new(
//!     MemorySource::new().with_template("templates/go/gin/main.txt", "package yourapp"),
//! );
//!
//! let mut manifest = Manifest::new();
//! manifest.push(
//!     CopyTask::builder("templates/go/gin/main.txt", "demo/main.go")
//!         .substitute("yourapp", "demo")
//!         .build()?,
//! );
//!
//! let result = Materializer::new(5).materialize(manifest, source).await?;
//! for failure in result.failures() {
//!     eprintln!("{}: {:?}", failure.task.source_key(), failure.outcome.error());
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod materializer;
pub mod source;
pub mod substitute;
pub mod types;

pub use error::{Error, FetchError, Result, SubstituteError, TaskError};
pub use materializer::{materialize, Materializer, DEFAULT_CONCURRENCY};
pub use source::{DirectorySource, MemorySource, S3Source, S3SourceConfig, TemplateSource};
pub use substitute::Substituter;
pub use types::{
    CopyTask, CopyTaskBuilder, FailureSummary, Manifest, MaterializationResult, ReportSummary,
    Substitutions, TaskOutcome, TaskReport,
};

// Re-exported so callers can cancel without depending on tokio-util directly
pub use tokio_util::sync::CancellationToken;
