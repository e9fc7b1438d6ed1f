//! Axum route handlers for applications and conversations.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::tracking::{ConversationMessageRow, ConversationThreadRow, JobApplicationRow};
use crate::profiles::fetch_profile;
use crate::routes::UserIdQuery;
use crate::state::AppState;
use crate::tracking::ApplicationStatus;

#[derive(Debug, Deserialize)]
pub struct CreateApplicationRequest {
    pub user_id: Uuid,
    pub company: String,
    pub position: String,
    pub status: Option<ApplicationStatus>,
    pub job_url: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub user_id: Uuid,
    pub status: ApplicationStatus,
}

/// GET /api/v1/applications?user_id=
pub async fn handle_list_applications(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<JobApplicationRow>>, AppError> {
    let rows = sqlx::query_as::<_, JobApplicationRow>(
        "SELECT * FROM job_applications WHERE user_id = $1 ORDER BY applied_at DESC",
    )
    .bind(params.user_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// POST /api/v1/applications
pub async fn handle_create_application(
    State(state): State<AppState>,
    Json(request): Json<CreateApplicationRequest>,
) -> Result<Json<JobApplicationRow>, AppError> {
    if request.company.trim().is_empty() || request.position.trim().is_empty() {
        return Err(AppError::Validation(
            "company and position are required".to_string(),
        ));
    }
    fetch_profile(&state.db, request.user_id).await?;
    let status = request.status.unwrap_or(ApplicationStatus::Applied);

    let row = sqlx::query_as::<_, JobApplicationRow>(
        r#"
        INSERT INTO job_applications (user_id, company, position, status, job_url, notes)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(request.user_id)
    .bind(request.company.trim())
    .bind(request.position.trim())
    .bind(status.as_str())
    .bind(request.job_url)
    .bind(request.notes)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(row))
}

/// PATCH /api/v1/applications/:id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<JobApplicationRow>, AppError> {
    let row = sqlx::query_as::<_, JobApplicationRow>(
        r#"
        UPDATE job_applications
        SET status = $3, updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(application_id)
    .bind(request.user_id)
    .bind(request.status.as_str())
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Application {application_id} not found")))?;

    Ok(Json(row))
}

/// GET /api/v1/conversations?user_id=
pub async fn handle_list_threads(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<ConversationThreadRow>>, AppError> {
    let rows = sqlx::query_as::<_, ConversationThreadRow>(
        "SELECT * FROM conversation_threads WHERE user_id = $1 ORDER BY last_message_at DESC",
    )
    .bind(params.user_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// GET /api/v1/conversations/:id/messages?user_id=
pub async fn handle_list_messages(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<ConversationMessageRow>>, AppError> {
    let owned: Option<Uuid> = sqlx::query_scalar(
        "SELECT id FROM conversation_threads WHERE id = $1 AND user_id = $2",
    )
    .bind(thread_id)
    .bind(params.user_id)
    .fetch_optional(&state.db)
    .await?;
    if owned.is_none() {
        return Err(AppError::NotFound(format!("Conversation {thread_id} not found")));
    }

    let rows = sqlx::query_as::<_, ConversationMessageRow>(
        "SELECT * FROM conversation_messages WHERE thread_id = $1 ORDER BY sent_at ASC",
    )
    .bind(thread_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}
