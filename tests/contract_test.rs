// tests/contract_test.rs
// Tool schemas and argument validation for the four task operations

use serde_json::json;
use tasknest_backend::agent::contract::{
    CreateTaskArgs, TaskRefArgs, ToolName, UpdateTaskArgs, task_tools,
};
use tasknest_backend::agent::error::AgentError;

#[test]
fn test_task_tools_are_valid_schemas() {
    let tools = task_tools();
    assert_eq!(tools.len(), 4);

    for tool in &tools {
        assert_eq!(tool["type"], "function");

        let func = &tool["function"];
        assert!(func["name"].is_string());
        assert!(func["description"].is_string());

        let params = &func["parameters"];
        assert_eq!(params["type"], "object");
        assert!(params["properties"].is_object());
        assert!(params["required"].is_array());
    }

    let names: Vec<&str> = tools
        .iter()
        .map(|t| t["function"]["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        ["create_task", "update_task", "delete_task", "get_task_info"]
    );
}

#[test]
fn test_tool_name_is_a_closed_set() {
    assert_eq!(ToolName::parse("create_task"), Some(ToolName::CreateTask));
    assert_eq!(ToolName::parse("update_task"), Some(ToolName::UpdateTask));
    assert_eq!(ToolName::parse("delete_task"), Some(ToolName::DeleteTask));
    assert_eq!(ToolName::parse("get_task_info"), Some(ToolName::GetTaskInfo));
    assert_eq!(ToolName::parse("drop_tables"), None);
    assert_eq!(ToolName::parse(""), None);
}

#[test]
fn test_create_requires_title() {
    let err = CreateTaskArgs::from_value(&json!({})).unwrap_err();
    assert!(matches!(err, AgentError::Validation(_)));
    assert_eq!(err.user_message(), "Missing required field: title");

    // Explicit null counts as missing
    let err = CreateTaskArgs::from_value(&json!({ "title": null })).unwrap_err();
    assert_eq!(err.user_message(), "Missing required field: title");
}

#[test]
fn test_create_rejects_overlong_title() {
    let long_title = "x".repeat(256);
    let err = CreateTaskArgs::from_value(&json!({ "title": long_title })).unwrap_err();
    assert_eq!(
        err.user_message(),
        "title must be between 1 and 255 characters"
    );

    // 255 chars is fine
    let ok_title = "x".repeat(255);
    assert!(CreateTaskArgs::from_value(&json!({ "title": ok_title })).is_ok());
}

#[test]
fn test_create_ignores_unknown_fields() {
    let args = CreateTaskArgs::from_value(&json!({
        "title": "Buy milk",
        "owner_id": "someone-else",
        "frobnicate": true
    }))
    .unwrap();

    assert_eq!(args.task.title, "Buy milk");
    // No owner-like field exists on the parsed arguments at all
    assert!(args.task.priority.is_none());
}

#[test]
fn test_create_parses_iso_deadline() {
    let args = CreateTaskArgs::from_value(&json!({
        "title": "Catch flight",
        "deadline": "2026-03-01T17:00:00Z"
    }))
    .unwrap();
    assert!(args.task.deadline.is_some());

    let err = CreateTaskArgs::from_value(&json!({
        "title": "Catch flight",
        "deadline": "next tuesday"
    }))
    .unwrap_err();
    assert_eq!(
        err.user_message(),
        "Invalid deadline format. Use ISO 8601 format."
    );
}

#[test]
fn test_update_rejects_unknown_status_listing_accepted_values() {
    let task_id = uuid::Uuid::new_v4().to_string();
    let err = UpdateTaskArgs::from_value(&json!({
        "task_id": task_id,
        "status": "archived"
    }))
    .unwrap_err();

    let message = err.user_message();
    assert!(message.contains("archived"), "names the bad value: {message}");
    assert!(message.contains("pending, in_progress, completed"));
}

#[test]
fn test_update_rejects_unknown_priority_listing_accepted_values() {
    let task_id = uuid::Uuid::new_v4().to_string();
    let err = UpdateTaskArgs::from_value(&json!({
        "task_id": task_id,
        "priority": "critical"
    }))
    .unwrap_err();

    let message = err.user_message();
    assert!(message.contains("critical"));
    assert!(message.contains("low, medium, high, urgent"));
}

#[test]
fn test_malformed_task_id_is_a_validation_error() {
    // Distinct from the not-found result the dispatcher produces later
    let err = TaskRefArgs::from_value(&json!({ "task_id": "the milk task" })).unwrap_err();
    assert_eq!(err.user_message(), "Invalid task ID format");

    let err = TaskRefArgs::from_value(&json!({})).unwrap_err();
    assert_eq!(err.user_message(), "Missing required field: task_id");
}

#[test]
fn test_update_accepts_partial_fields() {
    let task_id = uuid::Uuid::new_v4().to_string();
    let args = UpdateTaskArgs::from_value(&json!({
        "task_id": task_id,
        "status": "completed"
    }))
    .unwrap();

    assert!(args.patch.status.is_some());
    assert!(args.patch.title.is_none());
    assert!(args.patch.description.is_none());
    assert!(args.patch.priority.is_none());
    assert!(args.patch.deadline.is_none());
}
