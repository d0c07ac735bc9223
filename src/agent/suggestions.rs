// src/agent/suggestions.rs
// Machine-suggested priority and duration for newly created tasks

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::llm::provider::{LlmProvider, Message};
use crate::tasks::store::TaskStore;
use crate::tasks::types::{Task, TaskPatch, TaskPriority};

const ANALYZER_SYSTEM: &str = "You are a task analysis assistant that estimates priority and duration.\n\
     Analyze the task and respond with a JSON object containing:\n\
     - \"priority\": one of \"low\", \"medium\", \"high\", \"urgent\"\n\
     - \"estimated_hours\": a whole number between 1 and 999\n\
     Consider urgency indicators, complexity, and typical time for the task type.\n\
     Respond with the JSON object only.";

/// Ask the model for a priority and duration estimate.
///
/// Returns None on any failure; suggestions are best-effort and never block
/// or fail the request that triggered them.
pub async fn suggest_priority_and_duration(
    llm: &Arc<dyn LlmProvider>,
    description: &str,
    timeout: Duration,
) -> Option<(TaskPriority, i64)> {
    let prompt = format!(
        "Analyze this task and provide priority and duration estimate:\n\n\
         Task: {description}\n\n\
         Respond with JSON in this format:\n{{\"priority\": \"medium\", \"estimated_hours\": 4}}"
    );

    let response = match tokio::time::timeout(
        timeout,
        llm.chat(vec![Message::user(prompt)], ANALYZER_SYSTEM.to_string()),
    )
    .await
    {
        Ok(Ok(r)) => r,
        Ok(Err(e)) => {
            warn!("[SUGGEST] model call failed: {}", e);
            return None;
        }
        Err(_) => {
            warn!("[SUGGEST] model call timed out");
            return None;
        }
    };

    parse_suggestion(&response.content)
}

/// Parse the model's reply. Tolerates surrounding prose or code fences by
/// extracting the first JSON object.
fn parse_suggestion(reply: &str) -> Option<(TaskPriority, i64)> {
    let trimmed = reply.trim();
    let json_str = if trimmed.starts_with('{') {
        trimmed
    } else {
        let start = trimmed.find('{')?;
        let end = trimmed.rfind('}')?;
        &trimmed[start..=end]
    };

    let parsed: Value = match serde_json::from_str(json_str) {
        Ok(v) => v,
        Err(e) => {
            warn!("[SUGGEST] unparseable reply: {}", e);
            return None;
        }
    };

    let priority = parsed
        .get("priority")
        .and_then(|v| v.as_str())
        .and_then(|s| TaskPriority::parse(&s.to_lowercase()))?;

    let hours = parsed.get("estimated_hours").and_then(|v| v.as_i64())?;
    if !(1..=999).contains(&hours) {
        warn!("[SUGGEST] hours estimate out of range: {}", hours);
        return None;
    }

    Some((priority, hours))
}

/// Fill in suggestions for a freshly created task in the background.
///
/// Only fields the user left unset are touched; every failure degrades to a
/// warn log.
pub fn spawn_for_task(llm: Arc<dyn LlmProvider>, store: TaskStore, task: Task, timeout: Duration) {
    if task.priority.is_some() && task.estimated_duration.is_some() {
        return;
    }

    tokio::spawn(async move {
        let description = match &task.description {
            Some(d) => format!("{}. {}", task.title, d),
            None => task.title.clone(),
        };

        let Some((priority, hours)) =
            suggest_priority_and_duration(&llm, &description, timeout).await
        else {
            return;
        };

        let patch = TaskPatch {
            priority: task.priority.is_none().then_some(priority),
            estimated_duration: task.estimated_duration.is_none().then_some(hours),
            ..Default::default()
        };

        match store.update(&task.id, patch).await {
            Ok(_) => info!(
                "[SUGGEST] task {} suggested priority={} hours={}",
                task.id,
                priority.as_str(),
                hours
            ),
            Err(e) => warn!("[SUGGEST] failed to store suggestions for {}: {}", task.id, e),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_suggestion_plain_json() {
        let parsed = parse_suggestion(r#"{"priority": "high", "estimated_hours": 3}"#);
        assert_eq!(parsed, Some((TaskPriority::High, 3)));
    }

    #[test]
    fn test_parse_suggestion_with_code_fence() {
        let reply = "```json\n{\"priority\": \"low\", \"estimated_hours\": 12}\n```";
        let parsed = parse_suggestion(reply);
        assert_eq!(parsed, Some((TaskPriority::Low, 12)));
    }

    #[test]
    fn test_parse_suggestion_rejects_bad_priority() {
        assert_eq!(
            parse_suggestion(r#"{"priority": "asap", "estimated_hours": 3}"#),
            None
        );
    }

    #[test]
    fn test_parse_suggestion_rejects_out_of_range_hours() {
        assert_eq!(
            parse_suggestion(r#"{"priority": "low", "estimated_hours": 0}"#),
            None
        );
        assert_eq!(
            parse_suggestion(r#"{"priority": "low", "estimated_hours": 1000}"#),
            None
        );
    }
}
