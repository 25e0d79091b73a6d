#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Launch Reporter
//!
//! Asynchronous reporting core for a ReportPortal-style test results service.
//!
//! ## Overview
//!
//! Test frameworks start and finish test items from many workers, in any order, and
//! expect reporting never to block them. The remote service, on the other hand,
//! requires that an item is finished only after all of its children are. This crate
//! sits between the two: every remote call runs asynchronously on tokio, and a
//! per-item completion tree orders the finish calls so the service always observes
//! a consistent sequence.
//!
//! ## Architecture
//!
//! ```text
//!  Launch ──▶ CompletionScheduler ──▶ ReportPortalClient (remote)
//!                 │        │
//!                 │        └─▶ RetryPolicy (item finish)
//!                 ├─▶ ItemTreeRegistry (children completions per item)
//!                 └─▶ LoggingContext (batched logs per item)
//! ```
//!
//! ## Module Organization
//!
//! - [`launch`] - Launch session: start/finish of the launch, rerun and attach
//! - [`scheduler`] - Completion scheduler sequencing item start/finish
//! - [`registry`] - Item tree registry keyed by item handles
//! - [`logging_context`] - Per-item log batch pipeline and task-local propagation
//! - [`resilience`] - Retry policy for item finish
//! - [`client`] - Remote collaborator trait and multipart batch payload
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use launch_reporter::{LaunchBuilder, ReporterConfig, ReportPortalClient};
//! use launch_reporter::models::{FinishExecutionRq, FinishTestItemRq, ItemStatus, ItemType, LogLevel, SaveLogRq, StartTestItemRq};
//! use std::sync::Arc;
//!
//! # async fn example(client: Arc<dyn ReportPortalClient>) -> launch_reporter::ReportingResult<()> {
//! launch_reporter::logging::init_structured_logging();
//! let config = ReporterConfig::load(None)?;
//! let launch = LaunchBuilder::new(client, config).build_from_config();
//! launch.start();
//!
//! let test = launch.start_test_item(StartTestItemRq::new("login works", ItemType::Step));
//! if let Some(context) = launch.logging_context(&test) {
//!     context.emit(|id| SaveLogRq::new(id, LogLevel::Info, "opening login page"));
//! }
//! launch.finish_test_item(&test, FinishTestItemRq::with_status(ItemStatus::Passed));
//!
//! launch.finish(FinishExecutionRq::now()).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod completion;
pub mod config;
pub mod error;
pub mod handle;
pub mod image;
pub mod launch;
pub mod launch_store;
pub mod logging;
pub mod logging_context;
pub mod models;
pub mod registry;
pub mod resilience;
pub mod scheduler;
pub mod test_utils;

pub use client::{MultiPartRequest, ReportPortalClient};
pub use completion::Completion;
pub use config::ReporterConfig;
pub use error::{ErrorType, ReportingError, ReportingResult};
pub use handle::{Handle, HandleKey, ItemHandle, LaunchHandle};
pub use launch::{Launch, LaunchBuilder};
pub use launch_store::{InMemoryLaunchStore, LaunchStore};
pub use logging_context::{emit_log, spawn_in_context, LoggingContext};
pub use registry::ItemTreeRegistry;
pub use resilience::RetryPolicy;
pub use scheduler::{CompletionScheduler, FinishOutcome};
