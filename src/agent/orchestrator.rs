// src/agent/orchestrator.rs
// Conversation Orchestrator - turns free-form user text into dispatched
// tool calls and composes the final reply

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::contract::{ToolName, task_tools};
use super::dispatcher::{TaskSnapshot, ToolDispatcher, ToolInvocationRequest, ToolResult};
use crate::llm::provider::{FunctionCall, LlmProvider, Message, ToolCallInfo, ToolResponse};

/// Fixed reply when the model call itself fails or times out
pub const MODEL_FAILURE_REPLY: &str = "I couldn't process that, please try again.";

/// The action performed during a conversational turn, for UI state sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentAction {
    Create,
    Update,
    Delete,
    None,
}

/// Final reply to one conversational turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReply {
    pub message: String,
    pub success: bool,
    pub action: AgentAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_data: Option<TaskSnapshot>,
}

/// One decoded model turn. The model either answers in plain text or asks
/// for tool calls; nothing else is representable.
enum ModelTurn {
    Plain(String),
    ToolCalls {
        text: String,
        calls: Vec<FunctionCall>,
    },
}

impl ModelTurn {
    fn from_response(response: ToolResponse) -> Self {
        if response.function_calls.is_empty() {
            Self::Plain(response.text_output)
        } else {
            Self::ToolCalls {
                text: response.text_output,
                calls: response.function_calls,
            }
        }
    }
}

/// Drives the conversational loop: model -> tool dispatch -> model,
/// strictly ordered, no rollback across calls within a turn.
pub struct ChatOrchestrator {
    llm: Arc<dyn LlmProvider>,
    dispatcher: ToolDispatcher,
    max_tool_turns: usize,
    model_timeout: Duration,
}

impl ChatOrchestrator {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        dispatcher: ToolDispatcher,
        max_tool_turns: usize,
        model_timeout: Duration,
    ) -> Self {
        Self {
            llm,
            dispatcher,
            max_tool_turns,
            model_timeout,
        }
    }

    /// Handle one user message on behalf of `acting_user`.
    ///
    /// Always returns a reply; failures surface as messages, never errors.
    pub async fn handle_message(&self, text: &str, acting_user: &str) -> AgentReply {
        let tools = task_tools();
        let system = system_prompt();
        let mut conversation = vec![Message::user(text.to_string())];
        let mut results: Vec<(Option<ToolName>, ToolResult)> = Vec::new();

        let mut response = match self.complete(&conversation, &system, &tools).await {
            Ok(r) => r,
            Err(e) => {
                warn!("[AGENT] model call failed: {}", e);
                return failure_reply();
            }
        };

        let mut final_text = None;

        for _ in 0..self.max_tool_turns {
            match ModelTurn::from_response(response) {
                ModelTurn::Plain(text) => {
                    final_text = Some(text);
                    break;
                }
                ModelTurn::ToolCalls { text, calls } => {
                    info!("[AGENT] model requested {} tool call(s)", calls.len());

                    // Dispatch strictly in the order received; a failure does
                    // not undo earlier calls in the same turn.
                    let mut tool_messages = Vec::with_capacity(calls.len());
                    for call in &calls {
                        let request = ToolInvocationRequest {
                            tool_name: call.name.clone(),
                            arguments: call.arguments.clone(),
                            acting_user: acting_user.to_string(),
                        };
                        let result = self.dispatcher.dispatch(&request).await;

                        let payload =
                            serde_json::to_string(&result).unwrap_or_else(|_| result.message.clone());
                        tool_messages.push(Message::tool_result(call.id.clone(), payload));
                        results.push((ToolName::parse(&call.name), result));
                    }

                    let call_info: Vec<ToolCallInfo> = calls
                        .iter()
                        .map(|c| ToolCallInfo {
                            id: c.id.clone(),
                            name: c.name.clone(),
                            arguments: c.arguments.clone(),
                        })
                        .collect();
                    conversation.push(Message::assistant_with_tool_calls(text, call_info));
                    conversation.extend(tool_messages);

                    response = match self.complete(&conversation, &system, &tools).await {
                        Ok(r) => r,
                        Err(e) => {
                            // Tools already ran; report their outcome rather
                            // than pretending nothing happened.
                            warn!("[AGENT] follow-up model call failed: {}", e);
                            break;
                        }
                    };
                }
            }
        }

        compose_reply(final_text, results)
    }

    async fn complete(
        &self,
        conversation: &[Message],
        system: &str,
        tools: &[serde_json::Value],
    ) -> anyhow::Result<ToolResponse> {
        tokio::time::timeout(
            self.model_timeout,
            self.llm
                .chat_with_tools(conversation.to_vec(), system.to_string(), tools.to_vec()),
        )
        .await
        .map_err(|_| anyhow::anyhow!("model call timed out after {:?}", self.model_timeout))?
    }
}

fn failure_reply() -> AgentReply {
    AgentReply {
        message: MODEL_FAILURE_REPLY.to_string(),
        success: false,
        action: AgentAction::None,
        task_data: None,
    }
}

/// Compose the final user-facing reply from the model's closing text and the
/// dispatched results. Validation and authorization messages pass through
/// verbatim so the user can tell "permission denied" from "which task".
fn compose_reply(final_text: Option<String>, results: Vec<(Option<ToolName>, ToolResult)>) -> AgentReply {
    let success = results.iter().all(|(_, r)| r.success);

    let action = results
        .iter()
        .rev()
        .find(|(_, r)| r.success)
        .and_then(|(tool, _)| match tool {
            Some(ToolName::CreateTask) => Some(AgentAction::Create),
            Some(ToolName::UpdateTask) => Some(AgentAction::Update),
            Some(ToolName::DeleteTask) => Some(AgentAction::Delete),
            _ => None,
        })
        .unwrap_or(AgentAction::None);

    let task_data = results
        .iter()
        .rev()
        .find_map(|(_, r)| if r.success { r.task.clone() } else { None });

    let message = if results.is_empty() {
        // Pure conversation, no tools involved
        final_text
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| MODEL_FAILURE_REPLY.to_string())
    } else if !success {
        // Surface the tool errors as-is, in order
        results
            .iter()
            .map(|(_, r)| r.message.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        match final_text.filter(|t| !t.trim().is_empty()) {
            Some(text) => text,
            None if results.len() == 1 => results[0].1.message.clone(),
            None => results
                .iter()
                .map(|(_, r)| r.message.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    };

    AgentReply {
        message,
        success,
        action,
        task_data,
    }
}

fn system_prompt() -> String {
    "You are a helpful assistant for task management. You help users create, update, \
     delete, and retrieve tasks through natural conversation.\n\n\
     Guidelines:\n\
     - Use the task tools for any request that should change or inspect tasks; \
     answer directly otherwise\n\
     - Ask for clarification if task details are missing\n\
     - Statuses are pending, in_progress, completed; priorities are low, medium, high, urgent\n\
     - When the user says a task is done, set its status to completed via update_task\n\
     - Pass deadlines as ISO 8601 timestamps\n\
     - Be friendly and explain what you did in simple terms"
        .to_string()
}
