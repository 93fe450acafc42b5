//! Assignment and draw API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::models::{
    AssignmentPair, DrawPool, IndividualDrawRequest, Member, SelectFromPoolRequest,
};
use crate::AppState;

/// GET /api/assignments - The full giver → receiver map.
pub async fn list_assignments(State(state): State<AppState>) -> ApiResult<Vec<AssignmentPair>> {
    let revision_id = state.service.revision_id().await.unwrap_or(0);
    success(state.service.assignments().await, revision_id)
}

/// GET /api/assignments/:memberId - The assigned receiver for one member.
pub async fn get_assignment(
    State(state): State<AppState>,
    Path(member_id): Path<i64>,
) -> ApiResult<Option<Member>> {
    let revision_id = state.service.revision_id().await.unwrap_or(0);

    match state.service.assignment_for(member_id).await {
        Ok(receiver) => success(receiver, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/assignments - Clear the whole map.
pub async fn clear_assignments(State(state): State<AppState>) -> ApiResult<()> {
    let revision_id = state.service.revision_id().await.unwrap_or(0);

    match state.service.clear_assignments().await {
        Ok(()) => {
            let new_revision = state.service.revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/draws/bulk - Replace the map with a fresh derangement.
pub async fn bulk_draw(State(state): State<AppState>) -> ApiResult<Vec<AssignmentPair>> {
    let revision_id = state.service.revision_id().await.unwrap_or(0);

    match state.service.bulk_draw().await {
        Ok(pairs) => {
            let new_revision = state.service.revision_id().await.unwrap_or(revision_id);
            success(pairs, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/draws/individual - Present the candidate pool for one drawer.
pub async fn request_individual_draw(
    State(state): State<AppState>,
    Json(request): Json<IndividualDrawRequest>,
) -> ApiResult<DrawPool> {
    let revision_id = state.service.revision_id().await.unwrap_or(0);

    match state.service.request_individual_draw(request.member_id).await {
        Ok(pool) => success(pool, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/draws/individual/select - Resolve the pending draw.
pub async fn select_from_pool(
    State(state): State<AppState>,
    Json(request): Json<SelectFromPoolRequest>,
) -> ApiResult<AssignmentPair> {
    let revision_id = state.service.revision_id().await.unwrap_or(0);

    match state.service.select_from_pool(request.pool_index).await {
        Ok(pair) => {
            let new_revision = state.service.revision_id().await.unwrap_or(revision_id);
            success(pair, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/draws/individual - Cancel the pending draw, committing nothing.
pub async fn cancel_individual_draw(State(state): State<AppState>) -> ApiResult<()> {
    let revision_id = state.service.revision_id().await.unwrap_or(0);
    state.service.cancel_individual_draw().await;
    success((), revision_id)
}
