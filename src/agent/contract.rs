// src/agent/contract.rs
// The fixed set of callable task operations: schemas and argument validation.
// Everything here runs before any store access.

use serde_json::Value;
use uuid::Uuid;

use super::error::AgentError;
use super::tool_builder::{ToolBuilder, properties};
use crate::tasks::types::{NewTask, TaskPatch, TaskPriority, TaskStatus};

/// The closed set of operations the model may invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    CreateTask,
    UpdateTask,
    DeleteTask,
    GetTaskInfo,
}

impl ToolName {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "create_task" => Some(Self::CreateTask),
            "update_task" => Some(Self::UpdateTask),
            "delete_task" => Some(Self::DeleteTask),
            "get_task_info" => Some(Self::GetTaskInfo),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateTask => "create_task",
            Self::UpdateTask => "update_task",
            Self::DeleteTask => "delete_task",
            Self::GetTaskInfo => "get_task_info",
        }
    }
}

/// Get the tool schemas handed to the model each turn
pub fn task_tools() -> Vec<Value> {
    vec![
        create_task_tool(),
        update_task_tool(),
        delete_task_tool(),
        get_task_info_tool(),
    ]
}

fn create_task_tool() -> Value {
    ToolBuilder::new(
        "create_task",
        "Create a new task for the user. Use this when the user asks to add, create, \
         or remember something to do.",
    )
    .property(
        "title",
        properties::string("Task title (required, 1-255 characters)"),
        true,
    )
    .property(
        "description",
        properties::string("Detailed task description (optional)"),
        false,
    )
    .property("priority", properties::priority_enum(), false)
    .property("deadline", properties::deadline(), false)
    .build()
}

fn update_task_tool() -> Value {
    ToolBuilder::new(
        "update_task",
        "Update an existing task. Only the fields you provide are changed. \
         Use status 'completed' when the user says a task is done.",
    )
    .property(
        "task_id",
        properties::task_id("ID of the task to update"),
        true,
    )
    .property("title", properties::string("New title (optional)"), false)
    .property(
        "description",
        properties::string("New description (optional)"),
        false,
    )
    .property("status", properties::status_enum(), false)
    .property("priority", properties::priority_enum(), false)
    .property("deadline", properties::deadline(), false)
    .build()
}

fn delete_task_tool() -> Value {
    ToolBuilder::new(
        "delete_task",
        "Delete a task permanently. Only the task's owner can delete it.",
    )
    .property(
        "task_id",
        properties::task_id("ID of the task to delete"),
        true,
    )
    .build()
}

fn get_task_info_tool() -> Value {
    ToolBuilder::new(
        "get_task_info",
        "Get full details of a specific task: status, priority, deadline, timestamps.",
    )
    .property(
        "task_id",
        properties::task_id("ID of the task to retrieve"),
        true,
    )
    .build()
}

// =============================================================================
// Argument parsing
// =============================================================================
// Unknown/extra fields are ignored. Missing required fields and enum
// mismatches produce validation errors naming the field and the accepted
// values. A malformed task id is a validation error, distinct from the
// not-found result produced later by the dispatcher.

/// Validated arguments for create_task
#[derive(Debug, Clone)]
pub struct CreateTaskArgs {
    pub task: NewTask,
}

impl CreateTaskArgs {
    pub fn from_value(args: &Value) -> Result<Self, AgentError> {
        let title = required_string(args, "title")?;
        validate_title(&title)?;

        Ok(Self {
            task: NewTask {
                title,
                description: optional_string(args, "description")?,
                priority: optional_priority(args)?,
                deadline: optional_deadline(args)?,
                estimated_duration: None,
            },
        })
    }
}

/// Validated arguments for update_task
#[derive(Debug, Clone)]
pub struct UpdateTaskArgs {
    pub task_id: String,
    pub patch: TaskPatch,
}

impl UpdateTaskArgs {
    pub fn from_value(args: &Value) -> Result<Self, AgentError> {
        let task_id = required_task_id(args)?;

        let title = optional_string(args, "title")?;
        if let Some(ref t) = title {
            validate_title(t)?;
        }

        let patch = TaskPatch {
            title,
            description: optional_string(args, "description")?,
            status: optional_status(args)?,
            priority: optional_priority(args)?,
            deadline: optional_deadline(args)?,
            estimated_duration: None,
        };

        Ok(Self { task_id, patch })
    }
}

/// Validated arguments for delete_task / get_task_info
#[derive(Debug, Clone)]
pub struct TaskRefArgs {
    pub task_id: String,
}

impl TaskRefArgs {
    pub fn from_value(args: &Value) -> Result<Self, AgentError> {
        Ok(Self {
            task_id: required_task_id(args)?,
        })
    }
}

fn required_string(args: &Value, field: &str) -> Result<String, AgentError> {
    match args.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::Null) | None => Err(AgentError::validation(format!(
            "Missing required field: {field}"
        ))),
        Some(Value::String(_)) => Err(AgentError::validation(format!(
            "Missing required field: {field}"
        ))),
        Some(_) => Err(AgentError::validation(format!(
            "Field '{field}' must be a string"
        ))),
    }
}

fn optional_string(args: &Value, field: &str) -> Result<Option<String>, AgentError> {
    match args.get(field) {
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(AgentError::validation(format!(
            "Field '{field}' must be a string"
        ))),
    }
}

fn validate_title(title: &str) -> Result<(), AgentError> {
    let len = title.chars().count();
    if len == 0 || len > 255 {
        return Err(AgentError::validation(
            "title must be between 1 and 255 characters",
        ));
    }
    Ok(())
}

fn required_task_id(args: &Value) -> Result<String, AgentError> {
    let raw = required_string(args, "task_id")?;
    if Uuid::parse_str(raw.trim()).is_err() {
        return Err(AgentError::validation("Invalid task ID format"));
    }
    Ok(raw.trim().to_string())
}

fn optional_status(args: &Value) -> Result<Option<TaskStatus>, AgentError> {
    match optional_string(args, "status")? {
        None => Ok(None),
        Some(raw) => TaskStatus::parse(&raw).map(Some).ok_or_else(|| {
            AgentError::validation(format!(
                "Invalid status '{raw}'. Must be one of: {}",
                TaskStatus::ACCEPTED
            ))
        }),
    }
}

fn optional_priority(args: &Value) -> Result<Option<TaskPriority>, AgentError> {
    match optional_string(args, "priority")? {
        None => Ok(None),
        Some(raw) => TaskPriority::parse(&raw).map(Some).ok_or_else(|| {
            AgentError::validation(format!(
                "Invalid priority '{raw}'. Must be one of: {}",
                TaskPriority::ACCEPTED
            ))
        }),
    }
}

fn optional_deadline(args: &Value) -> Result<Option<i64>, AgentError> {
    match optional_string(args, "deadline")? {
        None => Ok(None),
        Some(raw) => parse_deadline(&raw).map(Some),
    }
}

/// Parse an ISO 8601 timestamp to unix seconds
pub fn parse_deadline(raw: &str) -> Result<i64, AgentError> {
    chrono::DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.timestamp())
        .map_err(|_| AgentError::validation("Invalid deadline format. Use ISO 8601 format."))
}
