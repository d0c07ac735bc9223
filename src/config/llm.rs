// src/config/llm.rs
// OpenRouter provider and agent configuration

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

/// OpenRouter API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Hard bound on a single model call, in seconds
    pub timeout_secs: u64,
}

impl OpenRouterConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: super::helpers::env_or("OPENROUTER_API_KEY", ""),
            base_url: super::helpers::env_or(
                "OPENROUTER_BASE_URL",
                "https://openrouter.ai/api/v1",
            ),
            model: super::helpers::env_or("OPENROUTER_MODEL", "qwen/qwen-2.5-72b-instruct"),
            timeout_secs: super::helpers::env_parsed("OPENROUTER_TIMEOUT_SECONDS", 30),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(anyhow!(
                "OPENROUTER_API_KEY is not set. Get one from https://openrouter.ai/keys"
            ));
        }
        Ok(())
    }
}

/// Conversation agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model round-trips per conversational turn
    pub max_tool_turns: usize,
    /// Maximum length of a chat message in characters
    pub max_message_chars: usize,
    /// Timeout for background suggestion calls, in seconds
    pub suggestion_timeout_secs: u64,
}

impl AgentConfig {
    pub fn from_env() -> Self {
        Self {
            max_tool_turns: super::helpers::env_parsed("AGENT_MAX_TOOL_TURNS", 6),
            max_message_chars: super::helpers::env_parsed("AGENT_MAX_MESSAGE_CHARS", 2000),
            suggestion_timeout_secs: super::helpers::env_parsed("AI_TIMEOUT_SECONDS", 5),
        }
    }
}
