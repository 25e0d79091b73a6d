//! Multipart payload for batched log dispatch: one JSON part with every entry of the
//! batch and one binary part per attachment. Encoding onto the wire is the
//! transport's job.

use crate::models::SaveLogRq;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Name of the JSON part carrying the serialized entries
pub const LOG_REQUEST_JSON_PART: &str = "json_request_part";
/// Name shared by every binary part
pub const LOG_REQUEST_BINARY_PART: &str = "file";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryPart {
    pub part_name: String,
    pub file_name: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct MultiPartRequest {
    pub json_part_name: String,
    pub entries: Vec<SaveLogRq>,
    pub binary_parts: Vec<BinaryPart>,
}

impl MultiPartRequest {
    /// Build the payload for one batch, inlining attachments in entry order
    pub fn from_batch(entries: Vec<SaveLogRq>) -> Self {
        let binary_parts = entries
            .iter()
            .filter_map(|rq| rq.file.as_ref())
            .map(|file| BinaryPart {
                part_name: LOG_REQUEST_BINARY_PART.to_string(),
                file_name: file.name.clone(),
                content_type: file
                    .content_type
                    .as_deref()
                    .filter(|ct| !ct.is_empty())
                    .unwrap_or(OCTET_STREAM)
                    .to_string(),
                content: file.content.clone(),
            })
            .collect();

        Self {
            json_part_name: LOG_REQUEST_JSON_PART.to_string(),
            entries,
            binary_parts,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialized JSON part
    pub fn json_part(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.entries)
    }
}
