//! Bulk import API endpoints.
//!
//! Two-step flow: preview reconciles the rows and reports duplicates
//! without touching the roster; confirm commits the accepted candidates.

use axum::{extract::State, Json};

use super::{error, success, ApiResult};
use crate::models::{ImportConfirmRequest, ImportPreview, ImportPreviewRequest, Member};
use crate::AppState;

/// POST /api/import/preview - Reconcile raw rows against the roster.
pub async fn preview_import(
    State(state): State<AppState>,
    Json(request): Json<ImportPreviewRequest>,
) -> ApiResult<ImportPreview> {
    let revision_id = state.service.revision_id().await.unwrap_or(0);

    match state.service.preview_import(&request.rows).await {
        Ok(preview) => success(preview, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/import/confirm - Commit previously previewed candidates.
pub async fn confirm_import(
    State(state): State<AppState>,
    Json(request): Json<ImportConfirmRequest>,
) -> ApiResult<Vec<Member>> {
    let revision_id = state.service.revision_id().await.unwrap_or(0);

    match state.service.confirm_import(request.candidates).await {
        Ok(members) => {
            let new_revision = state.service.revision_id().await.unwrap_or(revision_id);
            success(members, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
