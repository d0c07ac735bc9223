// src/agent/tool_builder.rs
// Builder for creating OpenAI-compatible function tool schemas

use serde_json::{Value, json};

/// Builder for creating function tool schemas
pub struct ToolBuilder {
    name: String,
    description: String,
    properties: Vec<(String, Value)>,
    required: Vec<String>,
}

impl ToolBuilder {
    /// Create a new tool with name and description
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            properties: Vec::new(),
            required: Vec::new(),
        }
    }

    /// Add a property to the tool
    pub fn property(mut self, name: impl Into<String>, schema: Value, required: bool) -> Self {
        let name = name.into();
        if required {
            self.required.push(name.clone());
        }
        self.properties.push((name, schema));
        self
    }

    /// Build the final tool schema
    /// OpenAI Chat Completions format (nested function object)
    pub fn build(self) -> Value {
        let mut properties_obj = serde_json::Map::new();
        for (name, schema) in self.properties {
            properties_obj.insert(name, schema);
        }

        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": {
                    "type": "object",
                    "properties": properties_obj,
                    "required": self.required
                }
            }
        })
    }
}

/// Common property schemas
pub mod properties {
    use serde_json::{Value, json};

    /// Text property
    pub fn string(description: &str) -> Value {
        json!({
            "type": "string",
            "description": description
        })
    }

    /// Task identifier property
    pub fn task_id(description: &str) -> Value {
        json!({
            "type": "string",
            "description": description
        })
    }

    /// Task status enum property
    pub fn status_enum() -> Value {
        json!({
            "type": "string",
            "enum": ["pending", "in_progress", "completed"],
            "description": "Task status"
        })
    }

    /// Task priority enum property
    pub fn priority_enum() -> Value {
        json!({
            "type": "string",
            "enum": ["low", "medium", "high", "urgent"],
            "description": "Task priority"
        })
    }

    /// ISO 8601 deadline property
    pub fn deadline() -> Value {
        json!({
            "type": "string",
            "description": "Deadline in ISO 8601 format, e.g. 2026-03-01T17:00:00Z"
        })
    }
}
