// src/api/http/mod.rs

pub mod agent;
pub mod auth;
pub mod health;
pub mod tasks;

pub use agent::create_agent_router;
pub use auth::create_auth_router;
pub use health::{health_check, liveness_check, readiness_check};
pub use tasks::create_tasks_router;
