// src/tasks/permissions.rs
// Role resolution and the role x action authorization table

use serde::{Deserialize, Serialize};

use super::types::{ShareRole, Task, TaskShare};

/// Effective permission level a user has on a specific task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Editor,
    Viewer,
    None,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Editor => "editor",
            Self::Viewer => "viewer",
            Self::None => "none",
        }
    }
}

/// An action a user can attempt on a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Read,
    Edit,
    Delete,
    Share,
}

/// Resolve the effective role of `acting_user` on `task`.
///
/// `share` must be the (task, acting_user) share row if one exists; the
/// owner never has a share row, ownership wins outright.
pub fn resolve_role(task: &Task, acting_user: &str, share: Option<&TaskShare>) -> Role {
    if task.owner_id == acting_user {
        return Role::Owner;
    }

    match share {
        Some(s) if s.task_id == task.id && s.user_id == acting_user => match s.role {
            ShareRole::Editor => Role::Editor,
            ShareRole::Viewer => Role::Viewer,
        },
        _ => Role::None,
    }
}

/// The single source of truth for what each role may do.
pub fn role_allows(role: Role, action: TaskAction) -> bool {
    match (role, action) {
        (Role::Owner, _) => true,
        (Role::Editor, TaskAction::Read | TaskAction::Edit) => true,
        (Role::Editor, TaskAction::Delete | TaskAction::Share) => false,
        (Role::Viewer, TaskAction::Read) => true,
        (Role::Viewer, _) => false,
        (Role::None, _) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::types::TaskStatus;

    fn task(owner: &str) -> Task {
        Task {
            id: "task-1".to_string(),
            owner_id: owner.to_string(),
            title: "Test".to_string(),
            description: None,
            status: TaskStatus::Pending,
            priority: None,
            deadline: None,
            estimated_duration: None,
            completed_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn share(task_id: &str, user_id: &str, role: ShareRole) -> TaskShare {
        TaskShare {
            id: "share-1".to_string(),
            task_id: task_id.to_string(),
            user_id: user_id.to_string(),
            role,
            granted_by: "owner".to_string(),
            granted_at: 0,
        }
    }

    #[test]
    fn test_owner_wins_over_any_share() {
        let t = task("alice");
        assert_eq!(resolve_role(&t, "alice", None), Role::Owner);
        // A stray share row for the owner must not demote them
        let s = share("task-1", "alice", ShareRole::Viewer);
        assert_eq!(resolve_role(&t, "alice", Some(&s)), Role::Owner);
    }

    #[test]
    fn test_share_roles_resolve() {
        let t = task("alice");
        let editor = share("task-1", "bob", ShareRole::Editor);
        let viewer = share("task-1", "carol", ShareRole::Viewer);
        assert_eq!(resolve_role(&t, "bob", Some(&editor)), Role::Editor);
        assert_eq!(resolve_role(&t, "carol", Some(&viewer)), Role::Viewer);
    }

    #[test]
    fn test_no_share_resolves_to_none() {
        let t = task("alice");
        assert_eq!(resolve_role(&t, "mallory", None), Role::None);
    }

    #[test]
    fn test_mismatched_share_resolves_to_none() {
        let t = task("alice");
        // Share for a different task must not grant access
        let s = share("other-task", "bob", ShareRole::Editor);
        assert_eq!(resolve_role(&t, "bob", Some(&s)), Role::None);
    }

    #[test]
    fn test_authorization_table_exhaustive() {
        use TaskAction::*;

        let cases = [
            (Role::Owner, Read, true),
            (Role::Owner, Edit, true),
            (Role::Owner, Delete, true),
            (Role::Owner, Share, true),
            (Role::Editor, Read, true),
            (Role::Editor, Edit, true),
            (Role::Editor, Delete, false),
            (Role::Editor, Share, false),
            (Role::Viewer, Read, true),
            (Role::Viewer, Edit, false),
            (Role::Viewer, Delete, false),
            (Role::Viewer, Share, false),
            (Role::None, Read, false),
            (Role::None, Edit, false),
            (Role::None, Delete, false),
            (Role::None, Share, false),
        ];

        for (role, action, expected) in cases {
            assert_eq!(
                role_allows(role, action),
                expected,
                "role {:?} action {:?}",
                role,
                action
            );
        }
    }
}
