//! # Remote Reporting Client
//!
//! The seam between the reporting core and the transport. The core never speaks
//! HTTP itself: it drives an implementation of [`ReportPortalClient`] and only
//! inspects the outcome of each call (a value, or a classified [`ReportingError`]).
//!
//! [`ReportingError`]: crate::error::ReportingError

pub mod multipart;
pub mod traits;

pub use multipart::{BinaryPart, MultiPartRequest, OCTET_STREAM};
pub use traits::ReportPortalClient;
