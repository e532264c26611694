//! ============================================================================
//! Database Types - Metadata records for stored documents
//! ============================================================================

use serde::{Deserialize, Serialize};

/// Size and write time of one stored document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub key: String,
    pub bytes: usize,
    /// Unix timestamp of the last write
    pub updated_at: Option<i64>,
}

/// Summary of the whole database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbStats {
    pub documents: Vec<DocumentInfo>,
    pub total_bytes: usize,
}
