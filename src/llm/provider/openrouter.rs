// src/llm/provider/openrouter.rs
// OpenRouter provider using the OpenAI-compatible chat completions API

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::{FunctionCall, LlmProvider, Message, Response, TokenUsage, ToolResponse};

/// OpenRouter provider. Speaks the OpenAI chat completions wire format,
/// so any OpenRouter-hosted model with tool support works.
#[derive(Clone)]
pub struct OpenRouterProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenRouterProvider {
    /// Create a new OpenRouter provider. `timeout_secs` bounds every request.
    pub fn new(api_key: String, base_url: String, model: String, timeout_secs: u64) -> Result<Self> {
        if api_key.is_empty() {
            return Err(anyhow!("OpenRouter API key is required"));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(OpenRouterProvider {
            client,
            api_key,
            base_url,
            model,
        })
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request_body(
        &self,
        messages: &[Message],
        system: &str,
        tools: Option<&[Value]>,
    ) -> Value {
        let mut wire_messages: Vec<Value> = Vec::with_capacity(messages.len() + 1);

        if !system.is_empty() {
            wire_messages.push(json!({ "role": "system", "content": system }));
        }

        for m in messages {
            let mut msg = json!({ "role": m.role, "content": m.content });

            if let Some(id) = &m.tool_call_id {
                msg["tool_call_id"] = json!(id);
            }

            // Assistant tool calls carry JSON-string arguments on the wire
            if let Some(calls) = &m.tool_calls {
                let wire_calls: Vec<Value> = calls
                    .iter()
                    .map(|c| {
                        json!({
                            "id": c.id,
                            "type": "function",
                            "function": {
                                "name": c.name,
                                "arguments": c.arguments.to_string(),
                            }
                        })
                    })
                    .collect();
                msg["tool_calls"] = json!(wire_calls);
            }

            wire_messages.push(msg);
        }

        let mut body = json!({
            "model": self.model,
            "messages": wire_messages,
        });

        if let Some(tools) = tools {
            body["tools"] = json!(tools);
        }

        body
    }

    async fn send(&self, body: Value) -> Result<Value> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let error_msg = match status.as_u16() {
                400 => format!("Invalid request: {}", error_text),
                401 | 403 => "Invalid API key. Please check your OpenRouter key.".to_string(),
                429 => "Rate limit exceeded. Please try again later.".to_string(),
                _ => format!("OpenRouter request failed ({}): {}", status, error_text),
            };

            return Err(anyhow!(error_msg));
        }

        Ok(response.json().await?)
    }
}

/// Extract the first choice's message from a chat completions response
fn extract_message(response: &Value) -> Result<&Value> {
    response
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .ok_or_else(|| anyhow!("Malformed response: no choices returned"))
}

fn extract_token_usage(response: &Value) -> TokenUsage {
    let usage = response.get("usage");
    TokenUsage {
        input: usage
            .and_then(|u| u.get("prompt_tokens"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0),
        output: usage
            .and_then(|u| u.get("completion_tokens"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0),
    }
}

/// Parse the wire tool_calls array. Arguments arrive as a JSON string.
fn extract_function_calls(message: &Value) -> Result<Vec<FunctionCall>> {
    let Some(calls) = message.get("tool_calls").and_then(|t| t.as_array()) else {
        return Ok(Vec::new());
    };

    let mut parsed = Vec::with_capacity(calls.len());
    for call in calls {
        let id = call
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let function = call
            .get("function")
            .ok_or_else(|| anyhow!("Tool call missing function object"))?;
        let name = function
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Tool call missing function name"))?
            .to_string();
        let raw_args = function
            .get("arguments")
            .and_then(|v| v.as_str())
            .unwrap_or("{}");
        let arguments: Value = serde_json::from_str(raw_args)
            .map_err(|e| anyhow!("Tool call arguments are not valid JSON: {}", e))?;

        parsed.push(FunctionCall { id, name, arguments });
    }

    Ok(parsed)
}

#[async_trait]
impl LlmProvider for OpenRouterProvider {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    async fn chat(&self, messages: Vec<Message>, system: String) -> Result<Response> {
        let start = Instant::now();
        debug!("Sending chat request to {} ({} messages)", self.model, messages.len());

        let body = self.build_request_body(&messages, &system, None);
        let response = self.send(body).await?;

        let message = extract_message(&response)?;
        let content = message
            .get("content")
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string();
        let tokens = extract_token_usage(&response);
        let latency_ms = start.elapsed().as_millis() as i64;

        info!(
            "OpenRouter chat complete: {} in/{} out tokens, {}ms",
            tokens.input, tokens.output, latency_ms
        );

        Ok(Response {
            content,
            model: self.model.clone(),
            tokens,
            latency_ms,
        })
    }

    async fn chat_with_tools(
        &self,
        messages: Vec<Message>,
        system: String,
        tools: Vec<Value>,
    ) -> Result<ToolResponse> {
        let start = Instant::now();
        debug!(
            "Sending tool request to {} ({} messages, {} tools)",
            self.model,
            messages.len(),
            tools.len()
        );

        let body = self.build_request_body(&messages, &system, Some(&tools));
        let response = self.send(body).await?;

        let message = extract_message(&response)?;
        let text_output = message
            .get("content")
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string();
        let function_calls = extract_function_calls(message)?;
        let tokens = extract_token_usage(&response);
        let latency_ms = start.elapsed().as_millis() as i64;

        info!(
            "OpenRouter tool call complete: {} function call(s), {}ms",
            function_calls.len(),
            latency_ms
        );

        Ok(ToolResponse {
            text_output,
            function_calls,
            tokens,
            latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_function_calls_parses_string_arguments() {
        let message = json!({
            "content": "",
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {
                    "name": "create_task",
                    "arguments": r#"{"title": "Buy milk"}"#
                }
            }]
        });

        let calls = extract_function_calls(&message).unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "create_task");
        assert_eq!(calls[0].arguments["title"], "Buy milk");
    }

    #[test]
    fn test_extract_function_calls_absent_is_empty() {
        let message = json!({ "content": "Hello!" });
        let calls = extract_function_calls(&message).unwrap();
        assert!(calls.is_empty());
    }

    #[test]
    fn test_extract_function_calls_rejects_bad_json_arguments() {
        let message = json!({
            "tool_calls": [{
                "id": "call_1",
                "function": { "name": "create_task", "arguments": "not json {" }
            }]
        });

        assert!(extract_function_calls(&message).is_err());
    }

    #[test]
    fn test_provider_requires_api_key() {
        let result = OpenRouterProvider::new(
            String::new(),
            "https://openrouter.ai/api/v1".to_string(),
            "qwen/qwen-2.5-72b-instruct".to_string(),
            30,
        );
        assert!(result.is_err());
    }
}
