// src/config/server.rs
// Server, database, and logging configuration

use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: super::helpers::env_or("TASKNEST_HOST", "127.0.0.1"),
            port: super::helpers::env_parsed("TASKNEST_PORT", 8000),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self {
            url: super::helpers::env_or("DATABASE_URL", "sqlite://tasknest.db?mode=rwc"),
            max_connections: super::helpers::env_parsed("TASKNEST_SQLITE_MAX_CONNECTIONS", 5),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            level: super::helpers::env_or("TASKNEST_LOG_LEVEL", "info"),
        }
    }
}
