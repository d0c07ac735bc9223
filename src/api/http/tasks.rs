// src/api/http/tasks.rs
// Task CRUD and sharing endpoints

use axum::{
    Router,
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::agent::suggestions;
use crate::auth::AuthUser;
use crate::config::CONFIG;
use crate::state::AppState;
use crate::tasks::permissions::{Role, TaskAction, resolve_role, role_allows};
use crate::tasks::types::{NewTask, ShareRole, Task, TaskPatch, TaskPriority, TaskShare, TaskStatus};

pub fn create_tasks_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_task).get(list_tasks))
        .route(
            "/{task_id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/{task_id}/complete", patch(complete_task))
        .route("/{task_id}/share", post(share_task))
        .route("/{task_id}/share/{user_id}", delete(revoke_share))
}

#[derive(Debug, Deserialize)]
struct CreateTaskRequest {
    title: String,
    description: Option<String>,
    priority: Option<TaskPriority>,
    deadline: Option<DateTime<Utc>>,
    estimated_duration: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct UpdateTaskRequest {
    title: Option<String>,
    description: Option<String>,
    status: Option<TaskStatus>,
    priority: Option<TaskPriority>,
    deadline: Option<DateTime<Utc>>,
    estimated_duration: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ListParams {
    status: Option<TaskStatus>,
    priority: Option<TaskPriority>,
    skip: Option<i64>,
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
struct PaginatedResponse<T> {
    items: Vec<T>,
    total: i64,
    skip: i64,
    limit: i64,
}

#[derive(Debug, Deserialize)]
struct ShareRequest {
    email: String,
    role: ShareRole,
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), TaskApiError> {
    validate_title(&req.title)?;
    if let Some(hours) = req.estimated_duration {
        validate_duration(hours)?;
    }

    info!("Creating task for user {}: {}", user.email, req.title);

    let task = state
        .task_store
        .create(
            &user.id,
            NewTask {
                title: req.title,
                description: req.description,
                priority: req.priority,
                deadline: req.deadline.map(|d| d.timestamp()),
                estimated_duration: req.estimated_duration,
            },
        )
        .await
        .map_err(TaskApiError::internal)?;

    // Fill in machine suggestions in the background; the response never
    // waits on the model
    suggestions::spawn_for_task(
        state.llm_provider.clone(),
        state.task_store.clone(),
        task.clone(),
        Duration::from_secs(CONFIG.agent.suggestion_timeout_secs),
    );

    Ok((StatusCode::CREATED, Json(task)))
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<Task>>, TaskApiError> {
    let skip = params.skip.unwrap_or(0).max(0);
    let limit = params.limit.unwrap_or(20).clamp(1, 100);

    let (items, total) = state
        .task_store
        .list_visible(&user.id, params.status, params.priority, skip, limit)
        .await
        .map_err(TaskApiError::internal)?;

    Ok(Json(PaginatedResponse {
        items,
        total,
        skip,
        limit,
    }))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, TaskApiError> {
    let (task, _) = load_with_role(&state, &task_id, &user.id, TaskAction::Read).await?;
    Ok(Json(task))
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(task_id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, TaskApiError> {
    if let Some(ref title) = req.title {
        validate_title(title)?;
    }
    if let Some(hours) = req.estimated_duration {
        validate_duration(hours)?;
    }

    load_with_role(&state, &task_id, &user.id, TaskAction::Edit).await?;

    let task = state
        .task_store
        .update(
            &task_id,
            TaskPatch {
                title: req.title,
                description: req.description,
                status: req.status,
                priority: req.priority,
                deadline: req.deadline.map(|d| d.timestamp()),
                estimated_duration: req.estimated_duration,
            },
        )
        .await
        .map_err(TaskApiError::internal)?;

    info!("Task updated: {}", task_id);
    Ok(Json(task))
}

async fn complete_task(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, TaskApiError> {
    load_with_role(&state, &task_id, &user.id, TaskAction::Edit).await?;

    let task = state
        .task_store
        .update(
            &task_id,
            TaskPatch {
                status: Some(TaskStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .map_err(TaskApiError::internal)?;

    info!("Task completed: {}", task_id);
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(task_id): Path<String>,
) -> Result<StatusCode, TaskApiError> {
    load_with_role(&state, &task_id, &user.id, TaskAction::Delete).await?;

    state
        .task_store
        .delete(&task_id)
        .await
        .map_err(TaskApiError::internal)?;

    info!("Task deleted: {}", task_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn share_task(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(task_id): Path<String>,
    Json(req): Json<ShareRequest>,
) -> Result<Json<TaskShare>, TaskApiError> {
    let (task, _) = load_with_role(&state, &task_id, &user.id, TaskAction::Share).await?;

    let grantee = state
        .auth_service
        .find_user_by_email(&req.email)
        .await
        .map_err(TaskApiError::internal)?
        .ok_or_else(|| TaskApiError::Validation("No user with that email".to_string()))?;

    if grantee.id == task.owner_id {
        return Err(TaskApiError::Validation(
            "Cannot share a task with its owner".to_string(),
        ));
    }

    let share = state
        .task_store
        .grant_share(&task_id, &grantee.id, req.role, &user.id)
        .await
        .map_err(TaskApiError::internal)?;

    info!(
        "Task {} shared with {} as {}",
        task_id,
        grantee.id,
        req.role.as_str()
    );
    Ok(Json(share))
}

async fn revoke_share(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path((task_id, grantee_id)): Path<(String, String)>,
) -> Result<StatusCode, TaskApiError> {
    load_with_role(&state, &task_id, &user.id, TaskAction::Share).await?;

    let removed = state
        .task_store
        .revoke_share(&task_id, &grantee_id)
        .await
        .map_err(TaskApiError::internal)?;

    if !removed {
        return Err(TaskApiError::NotFound);
    }

    info!("Share revoked on task {} for {}", task_id, grantee_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Load a task and check the action. A task that is missing or invisible is
/// 404 either way; 403 only appears for users who can already see the task.
async fn load_with_role(
    state: &AppState,
    task_id: &str,
    user_id: &str,
    action: TaskAction,
) -> Result<(Task, Role), TaskApiError> {
    let task = state
        .task_store
        .get(task_id)
        .await
        .map_err(TaskApiError::internal)?
        .ok_or(TaskApiError::NotFound)?;

    let share = state
        .task_store
        .get_share(task_id, user_id)
        .await
        .map_err(TaskApiError::internal)?;

    let role = resolve_role(&task, user_id, share.as_ref());
    if role == Role::None {
        return Err(TaskApiError::NotFound);
    }
    if !role_allows(role, action) {
        return Err(TaskApiError::Forbidden);
    }

    Ok((task, role))
}

fn validate_title(title: &str) -> Result<(), TaskApiError> {
    let len = title.chars().count();
    if len == 0 || len > 255 {
        return Err(TaskApiError::Validation(
            "title must be between 1 and 255 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_duration(hours: i64) -> Result<(), TaskApiError> {
    if hours < 1 {
        return Err(TaskApiError::Validation(
            "estimated_duration must be a positive number of hours".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug)]
enum TaskApiError {
    Validation(String),
    Forbidden,
    NotFound,
    Internal(String),
}

impl TaskApiError {
    fn internal(e: anyhow::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

impl IntoResponse for TaskApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            TaskApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            TaskApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "You do not have permission to perform this action".to_string(),
            ),
            TaskApiError::NotFound => (StatusCode::NOT_FOUND, "Task not found".to_string()),
            TaskApiError::Internal(detail) => {
                error!("Task API internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
