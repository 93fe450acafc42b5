//! Bulk import wire types.

use serde::{Deserialize, Serialize};

/// Request body for an import preview: raw rows of cells as extracted from a
/// spreadsheet by the caller. Row 0 must be the header row.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreviewRequest {
    pub rows: Vec<Vec<String>>,
}

/// A candidate member accepted by the reconciler but not yet committed.
///
/// `id` is provisional: it continues from the roster counter at preview time
/// and is re-allocated on confirm.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberCandidate {
    pub id: i64,
    pub code: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<String>,
}

/// Why a row was rejected during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    #[serde(rename = "duplicate-in-batch")]
    DuplicateInBatch,
    #[serde(rename = "duplicate-in-roster")]
    DuplicateInRoster,
}

/// A rejected row with its source row number for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedRow {
    pub row: usize,
    pub code: String,
    pub display_name: String,
    pub reason: RejectReason,
}

/// Result of reconciling a batch against the roster. Nothing is committed
/// until the caller confirms the accepted candidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreview {
    pub accepted: Vec<MemberCandidate>,
    pub rejected: Vec<RejectedRow>,
}

/// Request body for committing a previously previewed batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportConfirmRequest {
    pub candidates: Vec<MemberCandidate>,
}
