//! Roster member model.

use serde::{Deserialize, Serialize};

/// A member of the gift exchange roster.
///
/// `id` is allocated once from the roster counter and never reused;
/// `code` is the human-readable identifier, unique case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: i64,
    pub code: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<String>,
}

/// Lenient mirror of [`Member`] used when decoding a persisted snapshot.
///
/// Every field is optional so that a partially corrupt record can be
/// inspected and discarded without failing the whole snapshot.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMemberRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub interests: Option<String>,
}

/// Request body for creating a new member.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberRequest {
    pub code: String,
    pub display_name: String,
    #[serde(default)]
    pub interests: Option<String>,
}

/// Request body for updating an existing member.
///
/// All fields are replaced; a rename of `code` is re-validated for
/// uniqueness against the rest of the roster.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRequest {
    pub code: String,
    pub display_name: String,
    #[serde(default)]
    pub interests: Option<String>,
}
