//! # Image Conversion Seam
//!
//! Log attachments that are raster images may be re-encoded before dispatch when
//! `convert_image` is enabled. The re-encoding itself is supplied by the host.

use crate::error::ReportingResult;

/// Content types treated as convertible raster images
const RASTER_IMAGE_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/gif",
    "image/bmp",
    "image/x-ms-bmp",
    "image/tiff",
    "image/webp",
];

/// Converted attachment bytes together with their new content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedImage {
    pub content: Vec<u8>,
    pub content_type: String,
}

pub trait ImageCodec: Send + Sync {
    /// Whether attachments of this content type should be converted
    fn is_image(&self, content_type: Option<&str>) -> bool {
        is_raster_image(content_type)
    }

    fn convert(&self, content: &[u8]) -> ReportingResult<ConvertedImage>;
}

pub fn is_raster_image(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase())
        .is_some_and(|ct| RASTER_IMAGE_TYPES.contains(&ct.as_str()))
}
