// src/tasks/store.rs
// Database operations for tasks and task shares

use anyhow::{Result, anyhow};
use chrono::Utc;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::types::{NewTask, ShareRole, Task, TaskPatch, TaskPriority, TaskShare, TaskStatus};

const TASK_COLUMNS: &str = "id, owner_id, title, description, status, priority, deadline, \
     estimated_duration, completed_at, created_at, updated_at";

/// Database store for tasks and their shares
#[derive(Clone)]
pub struct TaskStore {
    pool: SqlitePool,
}

impl TaskStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Task CRUD
    // =========================================================================

    /// Create a new task owned by `owner_id`
    pub async fn create(&self, owner_id: &str, input: NewTask) -> Result<Task> {
        let now = Utc::now().timestamp();

        let task = Task {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            title: input.title,
            description: input.description,
            status: TaskStatus::Pending,
            priority: input.priority,
            deadline: input.deadline,
            estimated_duration: input.estimated_duration,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO tasks
             (id, owner_id, title, description, status, priority, deadline,
              estimated_duration, completed_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&task.id)
        .bind(&task.owner_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.map(|p| p.as_str()))
        .bind(task.deadline)
        .bind(task.estimated_duration)
        .bind(task.completed_at)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(task)
    }

    /// Get a task by ID
    pub async fn get(&self, task_id: &str) -> Result<Option<Task>> {
        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"))
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_task(&r)).transpose()
    }

    /// Apply a partial update to a task.
    ///
    /// Only fields present in the patch change. completed_at is set when
    /// status transitions to completed and cleared when it moves away.
    pub async fn update(&self, task_id: &str, patch: TaskPatch) -> Result<Task> {
        let mut task = self
            .get(task_id)
            .await?
            .ok_or_else(|| anyhow!("Task not found: {}", task_id))?;

        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = Some(description);
        }
        if let Some(status) = patch.status {
            task.status = status;
            task.completed_at = match status {
                TaskStatus::Completed => Some(Utc::now().timestamp()),
                _ => None,
            };
        }
        if let Some(priority) = patch.priority {
            task.priority = Some(priority);
        }
        if let Some(deadline) = patch.deadline {
            task.deadline = Some(deadline);
        }
        if let Some(estimated_duration) = patch.estimated_duration {
            task.estimated_duration = Some(estimated_duration);
        }
        task.updated_at = Utc::now().timestamp();

        sqlx::query(
            "UPDATE tasks
             SET title = ?, description = ?, status = ?, priority = ?, deadline = ?,
                 estimated_duration = ?, completed_at = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.map(|p| p.as_str()))
        .bind(task.deadline)
        .bind(task.estimated_duration)
        .bind(task.completed_at)
        .bind(task.updated_at)
        .bind(&task.id)
        .execute(&self.pool)
        .await?;

        Ok(task)
    }

    /// Delete a task. Share rows cascade.
    pub async fn delete(&self, task_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(task_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// List tasks visible to a user (owned plus shared), newest first,
    /// with optional status/priority filters. Returns (tasks, total).
    pub async fn list_visible(
        &self,
        user_id: &str,
        status: Option<TaskStatus>,
        priority: Option<TaskPriority>,
        skip: i64,
        limit: i64,
    ) -> Result<(Vec<Task>, i64)> {
        const VISIBLE_WHERE: &str = "(t.owner_id = ?1 OR EXISTS (
                SELECT 1 FROM task_shares s WHERE s.task_id = t.id AND s.user_id = ?1
             ))
             AND (?2 IS NULL OR t.status = ?2)
             AND (?3 IS NULL OR t.priority = ?3)";

        let total: (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM tasks t WHERE {VISIBLE_WHERE}"
        ))
        .bind(user_id)
        .bind(status.map(|s| s.as_str()))
        .bind(priority.map(|p| p.as_str()))
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(&format!(
            "SELECT t.id, t.owner_id, t.title, t.description, t.status, t.priority,
                    t.deadline, t.estimated_duration, t.completed_at, t.created_at, t.updated_at
             FROM tasks t WHERE {VISIBLE_WHERE}
             ORDER BY t.created_at DESC LIMIT ?4 OFFSET ?5"
        ))
        .bind(user_id)
        .bind(status.map(|s| s.as_str()))
        .bind(priority.map(|p| p.as_str()))
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        let tasks = rows.iter().map(row_to_task).collect::<Result<Vec<_>>>()?;

        Ok((tasks, total.0))
    }

    // =========================================================================
    // Shares
    // =========================================================================

    /// Get the share row for (task, user), if any
    pub async fn get_share(&self, task_id: &str, user_id: &str) -> Result<Option<TaskShare>> {
        let row = sqlx::query(
            "SELECT id, task_id, user_id, role, granted_by, granted_at
             FROM task_shares WHERE task_id = ? AND user_id = ?",
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_share(&r)).transpose()
    }

    /// Grant `grantee` access to a task. Granting twice for the same grantee
    /// replaces the role; at most one share per (task, grantee) pair.
    pub async fn grant_share(
        &self,
        task_id: &str,
        grantee: &str,
        role: ShareRole,
        granted_by: &str,
    ) -> Result<TaskShare> {
        let share = TaskShare {
            id: Uuid::new_v4().to_string(),
            task_id: task_id.to_string(),
            user_id: grantee.to_string(),
            role,
            granted_by: granted_by.to_string(),
            granted_at: Utc::now().timestamp(),
        };

        sqlx::query(
            "INSERT INTO task_shares (id, task_id, user_id, role, granted_by, granted_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(task_id, user_id) DO UPDATE SET role = excluded.role,
                 granted_by = excluded.granted_by, granted_at = excluded.granted_at",
        )
        .bind(&share.id)
        .bind(&share.task_id)
        .bind(&share.user_id)
        .bind(share.role.as_str())
        .bind(&share.granted_by)
        .bind(share.granted_at)
        .execute(&self.pool)
        .await?;

        // The upsert may have kept the original row id
        self.get_share(task_id, grantee)
            .await?
            .ok_or_else(|| anyhow!("Share not found after grant"))
    }

    /// Revoke a grantee's access. Returns true if a share was removed.
    pub async fn revoke_share(&self, task_id: &str, grantee: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM task_shares WHERE task_id = ? AND user_id = ?")
            .bind(task_id)
            .bind(grantee)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_task(row: &SqliteRow) -> Result<Task> {
    let status_str: String = row.get("status");
    let priority_str: Option<String> = row.get("priority");

    Ok(Task {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        description: row.get("description"),
        status: TaskStatus::parse(&status_str)
            .ok_or_else(|| anyhow!("Unknown task status in store: {}", status_str))?,
        priority: priority_str
            .map(|p| {
                TaskPriority::parse(&p).ok_or_else(|| anyhow!("Unknown task priority in store: {}", p))
            })
            .transpose()?,
        deadline: row.get("deadline"),
        estimated_duration: row.get("estimated_duration"),
        completed_at: row.get("completed_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_share(row: &SqliteRow) -> Result<TaskShare> {
    let role_str: String = row.get("role");

    Ok(TaskShare {
        id: row.get("id"),
        task_id: row.get("task_id"),
        user_id: row.get("user_id"),
        role: ShareRole::parse(&role_str)
            .ok_or_else(|| anyhow!("Unknown share role in store: {}", role_str))?,
        granted_by: row.get("granted_by"),
        granted_at: row.get("granted_at"),
    })
}
