//! # Resilience Module
//!
//! Bounded, delayed retry for the one transient remote failure the reporting core
//! knows how to recover from: an item finish rejected with
//! `FINISH_ITEM_NOT_ALLOWED` because the remote side has not yet observed all of
//! the item's children.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use launch_reporter::resilience::RetryPolicy;
//! use launch_reporter::error::ReportingError;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), ReportingError> {
//! let policy = RetryPolicy::new(10, Duration::from_secs(10));
//!
//! let message = policy
//!     .run("finish item", ReportingError::is_retryable, || async {
//!         Ok::<_, ReportingError>("finished")
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod retry;

pub use retry::RetryPolicy;
