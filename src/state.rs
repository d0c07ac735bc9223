// src/state.rs
// Application state shared across handlers

use anyhow::Result;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::agent::{ChatOrchestrator, ToolDispatcher};
use crate::auth::AuthService;
use crate::config::CONFIG;
use crate::llm::provider::{LlmProvider, OpenRouterProvider};
use crate::tasks::TaskStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub auth_service: Arc<AuthService>,
    pub task_store: TaskStore,
    pub llm_provider: Arc<dyn LlmProvider>,
    pub orchestrator: Arc<ChatOrchestrator>,
}

impl AppState {
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        CONFIG.validate()?;

        info!("Initializing OpenRouter provider ({})", CONFIG.openrouter.model);
        let llm_provider: Arc<dyn LlmProvider> = Arc::new(OpenRouterProvider::new(
            CONFIG.openrouter.api_key.clone(),
            CONFIG.openrouter.base_url.clone(),
            CONFIG.openrouter.model.clone(),
            CONFIG.openrouter.timeout_secs,
        )?);

        let task_store = TaskStore::new(pool.clone());

        info!("Initializing conversation orchestrator");
        let orchestrator = Arc::new(ChatOrchestrator::new(
            llm_provider.clone(),
            ToolDispatcher::new(task_store.clone()),
            CONFIG.agent.max_tool_turns,
            Duration::from_secs(CONFIG.openrouter.timeout_secs),
        ));

        info!("Initializing authentication service");
        let auth_service = Arc::new(AuthService::new(pool.clone()));

        info!("Application state initialized");

        Ok(Self {
            pool,
            auth_service,
            task_store,
            llm_provider,
            orchestrator,
        })
    }
}
