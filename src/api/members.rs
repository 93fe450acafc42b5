//! Member API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateMemberRequest, Member, UpdateMemberRequest};
use crate::AppState;

/// GET /api/members - List all members in ascending id order.
pub async fn list_members(State(state): State<AppState>) -> ApiResult<Vec<Member>> {
    let revision_id = state.service.revision_id().await.unwrap_or(0);
    success(state.service.list_members().await, revision_id)
}

/// GET /api/members/:id - Get a single member.
pub async fn get_member(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Member> {
    let revision_id = state.service.revision_id().await.unwrap_or(0);

    match state.service.get_member(id).await {
        Some(member) => success(member, revision_id),
        None => error(
            AppError::NotFound(format!("Member {} not found", id)),
            revision_id,
        ),
    }
}

/// POST /api/members - Create a new member.
pub async fn create_member(
    State(state): State<AppState>,
    Json(request): Json<CreateMemberRequest>,
) -> ApiResult<Member> {
    let revision_id = state.service.revision_id().await.unwrap_or(0);

    // Validate required fields
    if request.code.trim().is_empty() {
        return error(
            AppError::Validation("Member code is required".to_string()),
            revision_id,
        );
    }
    if request.display_name.trim().is_empty() {
        return error(
            AppError::Validation("Display name is required".to_string()),
            revision_id,
        );
    }

    match state
        .service
        .create_member(request.code, request.display_name, request.interests)
        .await
    {
        Ok(member) => {
            let new_revision = state.service.revision_id().await.unwrap_or(revision_id);
            success(member, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/members/:id - Update a member.
pub async fn update_member(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateMemberRequest>,
) -> ApiResult<Member> {
    let revision_id = state.service.revision_id().await.unwrap_or(0);

    if request.code.trim().is_empty() || request.display_name.trim().is_empty() {
        return error(
            AppError::Validation("Member code and display name are required".to_string()),
            revision_id,
        );
    }

    match state
        .service
        .update_member(id, request.code, request.display_name, request.interests)
        .await
    {
        Ok(member) => {
            let new_revision = state.service.revision_id().await.unwrap_or(revision_id);
            success(member, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/members/:id - Delete a member and cascade into assignments.
pub async fn delete_member(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<()> {
    let revision_id = state.service.revision_id().await.unwrap_or(0);

    match state.service.delete_member(id).await {
        Ok(()) => {
            let new_revision = state.service.revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
