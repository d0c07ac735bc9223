// src/agent/dispatcher.rs
// Tool Dispatcher - validates, authorizes, and executes one tool invocation

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

use super::contract::{CreateTaskArgs, TaskRefArgs, ToolName, UpdateTaskArgs};
use super::error::AgentError;
use crate::tasks::permissions::{TaskAction, resolve_role, role_allows};
use crate::tasks::store::TaskStore;
use crate::tasks::types::{Task, TaskPatch, TaskPriority, TaskStatus};

/// The normalized form of what the model asked for. Produced per turn,
/// consumed immediately, never stored.
#[derive(Debug, Clone)]
pub struct ToolInvocationRequest {
    pub tool_name: String,
    pub arguments: Value,
    pub acting_user: String,
}

/// Affected-task snapshot returned with successful results for UI sync
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    pub priority: Option<TaskPriority>,
}

impl TaskSnapshot {
    fn of(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            status: task.status,
            priority: task.priority,
        }
    }
}

/// Outcome of one dispatched tool call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskSnapshot>,
}

impl ToolResult {
    fn ok(message: String, task: Option<TaskSnapshot>) -> Self {
        Self {
            success: true,
            message,
            task,
        }
    }
}

/// Routes validated tool invocations to the task store
#[derive(Clone)]
pub struct ToolDispatcher {
    store: TaskStore,
}

impl ToolDispatcher {
    pub fn new(store: TaskStore) -> Self {
        Self { store }
    }

    /// Dispatch one tool invocation. Never panics and never lets an error
    /// escape: every outcome, including failure, is a ToolResult with a
    /// user-facing message.
    pub async fn dispatch(&self, request: &ToolInvocationRequest) -> ToolResult {
        debug!(
            "[DISPATCH] tool={} user={}",
            request.tool_name, request.acting_user
        );

        match self.dispatch_inner(request).await {
            Ok(result) => result,
            Err(e) => {
                match &e {
                    AgentError::Store(detail) => {
                        error!("[DISPATCH] store failure in {}: {}", request.tool_name, detail);
                    }
                    other => {
                        debug!("[DISPATCH] {} rejected: {}", request.tool_name, other);
                    }
                }
                ToolResult {
                    success: false,
                    message: e.user_message(),
                    task: None,
                }
            }
        }
    }

    async fn dispatch_inner(
        &self,
        request: &ToolInvocationRequest,
    ) -> Result<ToolResult, AgentError> {
        // Unknown tool names never reach the store
        let Some(tool) = ToolName::parse(&request.tool_name) else {
            return Err(AgentError::validation(format!(
                "Unknown tool: {}",
                request.tool_name
            )));
        };

        match tool {
            ToolName::CreateTask => self.create_task(request).await,
            ToolName::UpdateTask => self.update_task(request).await,
            ToolName::DeleteTask => self.delete_task(request).await,
            ToolName::GetTaskInfo => self.get_task_info(request).await,
        }
    }

    /// Load a task and check the acting user may perform `action` on it.
    ///
    /// Every task-referencing operation funnels through here. A task that
    /// does not exist and a task the user may not touch produce the same
    /// error; the share lookup runs in both cases so the two paths stay
    /// close in cost.
    async fn load_authorized(
        &self,
        task_id: &str,
        acting_user: &str,
        action: TaskAction,
    ) -> Result<Task, AgentError> {
        let task = self.store.get(task_id).await?;
        let share = self.store.get_share(task_id, acting_user).await?;

        let Some(task) = task else {
            return Err(AgentError::NotFoundOrDenied);
        };

        let role = resolve_role(&task, acting_user, share.as_ref());
        if !role_allows(role, action) {
            return Err(AgentError::NotFoundOrDenied);
        }

        Ok(task)
    }

    async fn create_task(
        &self,
        request: &ToolInvocationRequest,
    ) -> Result<ToolResult, AgentError> {
        let args = CreateTaskArgs::from_value(&request.arguments)?;
        let priority = args.task.priority;

        // The acting user becomes owner unconditionally; ownership is never
        // settable through arguments.
        let task = self.store.create(&request.acting_user, args.task).await?;

        info!("[DISPATCH] created task {} for {}", task.id, request.acting_user);

        let message = match priority {
            Some(p) => format!(
                "Task '{}' created successfully with {} priority.",
                task.title,
                p.as_str()
            ),
            None => format!("Task '{}' created successfully.", task.title),
        };

        Ok(ToolResult::ok(message, Some(TaskSnapshot::of(&task))))
    }

    async fn update_task(
        &self,
        request: &ToolInvocationRequest,
    ) -> Result<ToolResult, AgentError> {
        let args = UpdateTaskArgs::from_value(&request.arguments)?;
        if args.patch.is_empty() {
            return Err(AgentError::validation(
                "Provide at least one field to update",
            ));
        }

        self.load_authorized(&args.task_id, &request.acting_user, TaskAction::Edit)
            .await?;

        let changed = describe_changes(&args.patch);
        let task = self.store.update(&args.task_id, args.patch).await?;

        info!("[DISPATCH] updated task {} for {}", task.id, request.acting_user);

        let message = format!(
            "Task '{}' updated successfully - changed {}.",
            task.title, changed
        );

        Ok(ToolResult::ok(message, Some(TaskSnapshot::of(&task))))
    }

    async fn delete_task(
        &self,
        request: &ToolInvocationRequest,
    ) -> Result<ToolResult, AgentError> {
        let args = TaskRefArgs::from_value(&request.arguments)?;

        let task = self
            .load_authorized(&args.task_id, &request.acting_user, TaskAction::Delete)
            .await?;

        self.store.delete(&args.task_id).await?;

        info!("[DISPATCH] deleted task {} for {}", task.id, request.acting_user);

        Ok(ToolResult::ok(
            format!("Task '{}' deleted successfully.", task.title),
            Some(TaskSnapshot::of(&task)),
        ))
    }

    async fn get_task_info(
        &self,
        request: &ToolInvocationRequest,
    ) -> Result<ToolResult, AgentError> {
        let args = TaskRefArgs::from_value(&request.arguments)?;

        let task = self
            .load_authorized(&args.task_id, &request.acting_user, TaskAction::Read)
            .await?;

        Ok(ToolResult::ok(
            format_task_details(&task),
            Some(TaskSnapshot::of(&task)),
        ))
    }
}

fn describe_changes(patch: &TaskPatch) -> String {
    let mut changes = Vec::new();
    if let Some(title) = &patch.title {
        changes.push(format!("title to '{}'", title));
    }
    if let Some(status) = patch.status {
        changes.push(format!("status to {}", status.as_str()));
    }
    if let Some(priority) = patch.priority {
        changes.push(format!("priority to {}", priority.as_str()));
    }
    if patch.description.is_some() {
        changes.push("description".to_string());
    }
    if patch.deadline.is_some() {
        changes.push("deadline".to_string());
    }
    if patch.estimated_duration.is_some() {
        changes.push("estimated duration".to_string());
    }
    changes.join(", ")
}

fn format_timestamp(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| secs.to_string())
}

fn format_task_details(task: &Task) -> String {
    format!(
        "Task: {}\nStatus: {}\nPriority: {}\nDescription: {}\nDeadline: {}\nCreated: {}\nUpdated: {}",
        task.title,
        task.status.as_str(),
        task.priority.map(|p| p.as_str()).unwrap_or("none"),
        task.description.as_deref().unwrap_or("No description"),
        task.deadline
            .map(format_timestamp)
            .unwrap_or_else(|| "No deadline".to_string()),
        format_timestamp(task.created_at),
        format_timestamp(task.updated_at),
    )
}
