// src/config/mod.rs
// Central configuration for the Tasknest backend

pub mod helpers;
pub mod llm;
pub mod server;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

lazy_static! {
    pub static ref CONFIG: TasknestConfig = TasknestConfig::from_env();
}

/// Main configuration structure - composes all domain configs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasknestConfig {
    pub server: server::ServerConfig,
    pub database: server::DatabaseConfig,
    pub logging: server::LoggingConfig,
    pub openrouter: llm::OpenRouterConfig,
    pub agent: llm::AgentConfig,
}

impl TasknestConfig {
    pub fn from_env() -> Self {
        // Don't panic if .env doesn't exist (for production)
        dotenv::dotenv().ok();

        Self {
            server: server::ServerConfig::from_env(),
            database: server::DatabaseConfig::from_env(),
            logging: server::LoggingConfig::from_env(),
            openrouter: llm::OpenRouterConfig::from_env(),
            agent: llm::AgentConfig::from_env(),
        }
    }

    /// Validate config on startup
    pub fn validate(&self) -> anyhow::Result<()> {
        self.openrouter.validate()?;
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        self.server.bind_address()
    }
}
