// tests/orchestrator_test.rs
// Conversation orchestrator driven by a scripted model

mod common;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tasknest_backend::agent::orchestrator::{AgentAction, ChatOrchestrator, MODEL_FAILURE_REPLY};
use tasknest_backend::agent::dispatcher::ToolDispatcher;
use tasknest_backend::llm::provider::{
    FunctionCall, LlmProvider, Message, Response, TokenUsage, ToolResponse,
};
use tasknest_backend::tasks::store::TaskStore;
use tasknest_backend::tasks::types::TaskStatus;

/// Provider that replays a fixed sequence of responses
struct ScriptedProvider {
    responses: Mutex<VecDeque<ToolResponse>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<ToolResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
        })
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, _messages: Vec<Message>, _system: String) -> Result<Response> {
        Err(anyhow!("chat is not scripted"))
    }

    async fn chat_with_tools(
        &self,
        _messages: Vec<Message>,
        _system: String,
        _tools: Vec<serde_json::Value>,
    ) -> Result<ToolResponse> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("script exhausted"))
    }
}

/// Provider whose every call fails
struct FailingProvider;

#[async_trait]
impl LlmProvider for FailingProvider {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn chat(&self, _messages: Vec<Message>, _system: String) -> Result<Response> {
        Err(anyhow!("upstream unavailable"))
    }

    async fn chat_with_tools(
        &self,
        _messages: Vec<Message>,
        _system: String,
        _tools: Vec<serde_json::Value>,
    ) -> Result<ToolResponse> {
        Err(anyhow!("upstream unavailable"))
    }
}

fn text_response(text: &str) -> ToolResponse {
    ToolResponse {
        text_output: text.to_string(),
        function_calls: vec![],
        tokens: TokenUsage::default(),
        latency_ms: 0,
    }
}

fn tool_response(calls: Vec<FunctionCall>) -> ToolResponse {
    ToolResponse {
        text_output: String::new(),
        function_calls: calls,
        tokens: TokenUsage::default(),
        latency_ms: 0,
    }
}

fn call(id: &str, name: &str, arguments: serde_json::Value) -> FunctionCall {
    FunctionCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

async fn setup_store() -> TaskStore {
    let pool = common::setup_test_db().await;
    common::insert_user(&pool, "user-1", "user1@example.com").await;
    TaskStore::new(pool)
}

fn orchestrator(llm: Arc<dyn LlmProvider>, store: TaskStore) -> ChatOrchestrator {
    ChatOrchestrator::new(
        llm,
        ToolDispatcher::new(store),
        6,
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn test_plain_text_passes_through_unchanged() {
    let store = setup_store().await;
    let llm = ScriptedProvider::new(vec![text_response("Hello! How can I help with your tasks?")]);
    let orch = orchestrator(llm, store.clone());

    let reply = orch.handle_message("hi there", "user-1").await;

    assert!(reply.success);
    assert_eq!(reply.message, "Hello! How can I help with your tasks?");
    assert_eq!(reply.action, AgentAction::None);
    assert!(reply.task_data.is_none());

    // General conversation must not touch the store
    let (tasks, _) = store.list_visible("user-1", None, None, 0, 10).await.unwrap();
    assert!(tasks.is_empty());
}

#[tokio::test]
async fn test_single_create_call_reports_the_tool_result() {
    let store = setup_store().await;
    let llm = ScriptedProvider::new(vec![
        tool_response(vec![call(
            "call_1",
            "create_task",
            json!({ "title": "Buy milk", "priority": "high" }),
        )]),
        // Model returns no closing text; the tool result message is used
        text_response(""),
    ]);
    let orch = orchestrator(llm, store.clone());

    let reply = orch.handle_message("add buy milk, high priority", "user-1").await;

    assert!(reply.success);
    assert!(reply.message.contains("Buy milk"));
    assert!(reply.message.contains("created successfully"));
    assert_eq!(reply.action, AgentAction::Create);

    let snapshot = reply.task_data.unwrap();
    let stored = store.get(&snapshot.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Buy milk");
    assert_eq!(stored.owner_id, "user-1");
}

#[tokio::test]
async fn test_model_closing_text_wins_when_all_calls_succeed() {
    let store = setup_store().await;
    let llm = ScriptedProvider::new(vec![
        tool_response(vec![call("call_1", "create_task", json!({ "title": "Walk dog" }))]),
        text_response("Done! I added 'Walk dog' to your list."),
    ]);
    let orch = orchestrator(llm, store);

    let reply = orch.handle_message("remind me to walk the dog", "user-1").await;

    assert!(reply.success);
    assert_eq!(reply.message, "Done! I added 'Walk dog' to your list.");
    assert_eq!(reply.action, AgentAction::Create);
}

#[tokio::test]
async fn test_multiple_calls_dispatch_in_order_without_rollback() {
    let store = setup_store().await;
    let bad_id = uuid::Uuid::new_v4().to_string();
    let llm = ScriptedProvider::new(vec![
        // First call succeeds, second references a nonexistent task
        tool_response(vec![
            call("call_1", "create_task", json!({ "title": "First" })),
            call("call_2", "delete_task", json!({ "task_id": bad_id })),
        ]),
        text_response("All done."),
    ]);
    let orch = orchestrator(llm, store.clone());

    let reply = orch.handle_message("create first and delete the other", "user-1").await;

    // The turn failed overall, but call 1's effect stands
    assert!(!reply.success);
    let (tasks, _) = store.list_visible("user-1", None, None, 0, 10).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "First");

    // Both results surface in order, errors verbatim
    assert!(reply.message.contains("created successfully"));
    assert!(reply.message.contains("not found or you don't have permission"));
}

#[tokio::test]
async fn test_validation_error_surfaces_as_is() {
    let store = setup_store().await;
    let task = store
        .create(
            "user-1",
            tasknest_backend::tasks::types::NewTask {
                title: "Real task".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let llm = ScriptedProvider::new(vec![
        tool_response(vec![call(
            "call_1",
            "update_task",
            json!({ "task_id": task.id, "status": "archived" }),
        )]),
        text_response("Hmm."),
    ]);
    let orch = orchestrator(llm, store.clone());

    let reply = orch.handle_message("archive my task", "user-1").await;

    assert!(!reply.success);
    assert!(reply.message.contains("Invalid status 'archived'"));
    // Store unchanged
    let unchanged = store.get(&task.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, TaskStatus::Pending);
}

#[tokio::test]
async fn test_model_failure_yields_fixed_apology_and_no_mutation() {
    let store = setup_store().await;
    let orch = orchestrator(Arc::new(FailingProvider), store.clone());

    let reply = orch.handle_message("add a task called oops", "user-1").await;

    assert!(!reply.success);
    assert_eq!(reply.message, MODEL_FAILURE_REPLY);
    assert_eq!(reply.action, AgentAction::None);

    let (tasks, _) = store.list_visible("user-1", None, None, 0, 10).await.unwrap();
    assert!(tasks.is_empty());
}

#[tokio::test]
async fn test_unknown_tool_from_model_is_an_error_result() {
    let store = setup_store().await;
    let llm = ScriptedProvider::new(vec![
        tool_response(vec![call("call_1", "format_disk", json!({}))]),
        text_response(""),
    ]);
    let orch = orchestrator(llm, store);

    let reply = orch.handle_message("format my disk", "user-1").await;

    assert!(!reply.success);
    assert!(reply.message.contains("Unknown tool"));
    assert_eq!(reply.action, AgentAction::None);
}

#[tokio::test]
async fn test_update_then_get_uses_last_result_action() {
    let store = setup_store().await;
    let task = store
        .create(
            "user-1",
            tasknest_backend::tasks::types::NewTask {
                title: "Finish report".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let llm = ScriptedProvider::new(vec![
        tool_response(vec![call(
            "call_1",
            "update_task",
            json!({ "task_id": task.id, "status": "completed" }),
        )]),
        tool_response(vec![call(
            "call_2",
            "get_task_info",
            json!({ "task_id": task.id }),
        )]),
        text_response("Marked it complete."),
    ]);
    let orch = orchestrator(llm, store.clone());

    let reply = orch.handle_message("finish the report task", "user-1").await;

    assert!(reply.success);
    // get_task_info does not count as a mutation; the update does
    assert_eq!(reply.action, AgentAction::Update);

    let stored = store.get(&task.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Completed);
    assert!(stored.completed_at.is_some());
}
