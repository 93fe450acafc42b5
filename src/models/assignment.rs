//! Assignment wire types.

use serde::{Deserialize, Serialize};

/// One committed giver → receiver pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentPair {
    pub giver_id: i64,
    pub receiver_id: i64,
}

/// Request body for starting an individual draw.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndividualDrawRequest {
    pub member_id: i64,
}

/// Request body for resolving a pending individual draw.
///
/// `pool_index` identifies which presented slot was clicked. It is validated
/// against the pool but carries no information about the outcome; the actual
/// pick is uniform over the whole pool.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectFromPoolRequest {
    pub pool_index: usize,
}

/// The candidate pool presented for a pending individual draw.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawPool {
    pub drawer_id: i64,
    pub pool: Vec<super::Member>,
}
