// src/api/http/agent.rs
// Conversational agent endpoints

use axum::{
    Router,
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::agent::AgentReply;
use crate::auth::AuthUser;
use crate::config::CONFIG;
use crate::state::AppState;
use crate::tasks::types::{TaskPriority, TaskStatus};

pub fn create_agent_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat", post(agent_chat))
        .route("/capabilities", get(agent_capabilities))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
}

async fn agent_chat(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<ChatRequest>,
) -> Result<Json<AgentReply>, ChatError> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err(ChatError::EmptyMessage);
    }
    if message.chars().count() > CONFIG.agent.max_message_chars {
        return Err(ChatError::MessageTooLong(CONFIG.agent.max_message_chars));
    }

    info!(
        "Agent chat from {}: {}",
        user.email,
        message.chars().take(50).collect::<String>()
    );

    let reply = state.orchestrator.handle_message(message, &user.id).await;

    info!("Agent completed for {} - action: {:?}", user.email, reply.action);

    Ok(Json(reply))
}

async fn agent_capabilities(_user: AuthUser) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "agent_name": "Task Manager",
        "capabilities": [
            {
                "action": "Create tasks",
                "description": "Add new tasks with title, description, priority, and deadline",
                "example": "Create a task called 'Buy groceries' with high priority"
            },
            {
                "action": "Update tasks",
                "description": "Change task title, status, priority, or deadline",
                "example": "Mark my project task as completed"
            },
            {
                "action": "Delete tasks",
                "description": "Remove tasks you no longer need",
                "example": "Delete the old task from yesterday"
            },
            {
                "action": "Get task info",
                "description": "Retrieve detailed information about a task",
                "example": "Show me the details of my project task"
            },
        ],
        "statuses": TaskStatus::ACCEPTED.split(", ").collect::<Vec<_>>(),
        "priorities": TaskPriority::ACCEPTED.split(", ").collect::<Vec<_>>(),
    }))
}

#[derive(Debug)]
enum ChatError {
    EmptyMessage,
    MessageTooLong(usize),
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let message = match self {
            ChatError::EmptyMessage => "message must not be empty".to_string(),
            ChatError::MessageTooLong(max) => {
                format!("message must be at most {max} characters")
            }
        };

        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": message })),
        )
            .into_response()
    }
}
