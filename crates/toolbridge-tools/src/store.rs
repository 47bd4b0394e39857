//! Record store for todo items.
//!
//! The real deployment sits in front of a relational store; this module
//! treats it as a key-value record store with known field shapes. An
//! in-memory implementation is provided for development and tests.

use std::{
    collections::HashMap,
    sync::{
        RwLock,
        atomic::{AtomicI64, Ordering},
    },
};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

/// One todo row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoRecord {
    pub id: String,
    pub user_id: String,
    /// Parent list the record belongs to (the session's list id).
    pub parent_id: String,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub priority: Priority,
    pub due_date: Option<String>,
    pub tags: Vec<String>,
    pub project_id: Option<String>,
    /// Ordering key within the parent list.
    pub position: i64,
    /// RFC 3339 timestamps, matching the upstream record shapes.
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

/// Fields for a new record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTodo {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<String>,
    pub tags: Option<Vec<String>>,
    pub project_id: Option<String>,
}

/// Partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub due_date: Option<String>,
    pub tags: Option<Vec<String>>,
    pub project_id: Option<String>,
}

/// Record store error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Todo not found: {0}")]
    NotFound(String),
    #[error("Store error: {0}")]
    Internal(String),
}

/// Trait for todo record backends.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create a new record under `parent_id` owned by `user_id`.
    async fn create(
        &self,
        user_id: &str,
        parent_id: &str,
        new: NewTodo,
    ) -> Result<TodoRecord, StoreError>;

    /// Fetch a live (not soft-deleted) record by id, scoped to the user.
    async fn get(&self, user_id: &str, id: &str) -> Result<Option<TodoRecord>, StoreError>;

    /// List live records under `parent_id` for the user.
    ///
    /// With a limit, the most recently created records come first;
    /// otherwise records are ordered by position, then newest first.
    async fn list(
        &self,
        user_id: &str,
        parent_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<TodoRecord>, StoreError>;

    /// Apply a partial update to a live record.
    async fn update(
        &self,
        user_id: &str,
        id: &str,
        patch: TodoPatch,
    ) -> Result<TodoRecord, StoreError>;

    /// Soft-delete a live record (sets `deleted_at`).
    async fn soft_delete(&self, user_id: &str, id: &str) -> Result<TodoRecord, StoreError>;
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// In-memory record store.
///
/// Useful for development and single-process deployments. Data is lost
/// on restart.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<String, TodoRecord>>,
    next_position: AtomicI64,
}

impl MemoryRecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn live<'a>(record: &'a TodoRecord, user_id: &str) -> Option<&'a TodoRecord> {
        (record.user_id == user_id && record.deleted_at.is_none()).then_some(record)
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create(
        &self,
        user_id: &str,
        parent_id: &str,
        new: NewTodo,
    ) -> Result<TodoRecord, StoreError> {
        let timestamp = now_rfc3339();
        let record = TodoRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            parent_id: parent_id.to_string(),
            title: new.title,
            description: new.description.unwrap_or_default(),
            completed: false,
            priority: new.priority.unwrap_or_default(),
            due_date: new.due_date,
            tags: new.tags.unwrap_or_default(),
            project_id: new.project_id,
            position: self.next_position.fetch_add(1, Ordering::Relaxed),
            created_at: timestamp.clone(),
            updated_at: timestamp,
            deleted_at: None,
        };

        self.records
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?
            .insert(record.id.clone(), record.clone());

        Ok(record)
    }

    async fn get(&self, user_id: &str, id: &str) -> Result<Option<TodoRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))?
            .get(id)
            .and_then(|r| Self::live(r, user_id))
            .cloned())
    }

    async fn list(
        &self,
        user_id: &str,
        parent_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<TodoRecord>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))?;

        let mut result: Vec<TodoRecord> = records
            .values()
            .filter(|r| {
                r.user_id == user_id && r.parent_id == parent_id && r.deleted_at.is_none()
            })
            .cloned()
            .collect();

        if let Some(limit) = limit {
            result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            result.truncate(limit);
        } else {
            result.sort_by(|a, b| {
                a.position
                    .cmp(&b.position)
                    .then_with(|| b.created_at.cmp(&a.created_at))
            });
        }

        Ok(result)
    }

    async fn update(
        &self,
        user_id: &str,
        id: &str,
        patch: TodoPatch,
    ) -> Result<TodoRecord, StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;

        let record = records
            .get_mut(id)
            .filter(|r| r.user_id == user_id && r.deleted_at.is_none())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if let Some(title) = patch.title {
            record.title = title;
        }
        if let Some(description) = patch.description {
            record.description = description;
        }
        if let Some(completed) = patch.completed {
            record.completed = completed;
        }
        if let Some(priority) = patch.priority {
            record.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            record.due_date = Some(due_date);
        }
        if let Some(tags) = patch.tags {
            record.tags = tags;
        }
        if let Some(project_id) = patch.project_id {
            record.project_id = Some(project_id);
        }
        record.updated_at = now_rfc3339();

        Ok(record.clone())
    }

    async fn soft_delete(&self, user_id: &str, id: &str) -> Result<TodoRecord, StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;

        let record = records
            .get_mut(id)
            .filter(|r| r.user_id == user_id && r.deleted_at.is_none())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let timestamp = now_rfc3339();
        record.deleted_at = Some(timestamp.clone());
        record.updated_at = timestamp;

        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_todo(title: &str) -> NewTodo {
        NewTodo {
            title: title.to_string(),
            ..NewTodo::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryRecordStore::new();
        let created = store.create("u1", "list", new_todo("buy milk")).await.unwrap();

        assert!(!created.completed);
        assert_eq!(created.priority, Priority::Low);

        let got = store.get("u1", &created.id).await.unwrap().unwrap();
        assert_eq!(got.title, "buy milk");
    }

    #[tokio::test]
    async fn test_get_scoped_to_user() {
        let store = MemoryRecordStore::new();
        let created = store.create("u1", "list", new_todo("mine")).await.unwrap();

        assert!(store.get("u2", &created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_orders_by_position() {
        let store = MemoryRecordStore::new();
        store.create("u1", "list", new_todo("first")).await.unwrap();
        store.create("u1", "list", new_todo("second")).await.unwrap();
        store.create("u1", "other", new_todo("elsewhere")).await.unwrap();

        let todos = store.list("u1", "list", None).await.unwrap();
        assert_eq!(todos.len(), 2);
        assert_eq!(todos[0].title, "first");
        assert_eq!(todos[1].title, "second");
    }

    #[tokio::test]
    async fn test_list_with_limit_truncates() {
        let store = MemoryRecordStore::new();
        for i in 0..5 {
            store
                .create("u1", "list", new_todo(&format!("t{i}")))
                .await
                .unwrap();
        }

        let todos = store.list("u1", "list", Some(2)).await.unwrap();
        assert_eq!(todos.len(), 2);
    }

    #[tokio::test]
    async fn test_update_merges_partial_fields() {
        let store = MemoryRecordStore::new();
        let created = store.create("u1", "list", new_todo("draft")).await.unwrap();

        let updated = store
            .update(
                "u1",
                &created.id,
                TodoPatch {
                    completed: Some(true),
                    priority: Some(Priority::High),
                    ..TodoPatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "draft");
        assert!(updated.completed);
        assert_eq!(updated.priority, Priority::High);
    }

    #[tokio::test]
    async fn test_update_unknown_id_fails() {
        let store = MemoryRecordStore::new();
        let err = store
            .update("u1", "missing", TodoPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_soft_delete_hides_from_reads() {
        let store = MemoryRecordStore::new();
        let created = store.create("u1", "list", new_todo("gone soon")).await.unwrap();

        store.soft_delete("u1", &created.id).await.unwrap();

        assert!(store.get("u1", &created.id).await.unwrap().is_none());
        assert!(store.list("u1", "list", None).await.unwrap().is_empty());

        let err = store.soft_delete("u1", &created.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
