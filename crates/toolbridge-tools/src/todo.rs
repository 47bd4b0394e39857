//! Todo CRUD tools.
//!
//! All four tools scope their record-store queries through the ambient
//! session identifiers: the current session's list id is the parent of
//! every record, and its user id is the owner. A session connected
//! without those parameters gets a structured "not configured" error.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use toolbridge_core::{Tool, ToolError, ToolOutput};
use toolbridge_session::SessionRouter;

use crate::store::{NewTodo, Priority, RecordStore, StoreError, TodoPatch, TodoRecord};

fn ambient_scope(session: &SessionRouter) -> Result<(String, String), ToolError> {
    let list_id = session.current_list_id().ok_or_else(|| {
        ToolError::NotConfigured(
            "no list id in the current session; connect with a list_id parameter".to_string(),
        )
    })?;
    let user_id = session.current_user_id().ok_or_else(|| {
        ToolError::NotConfigured(
            "no user id in the current session; connect with a user_id parameter".to_string(),
        )
    })?;
    Ok((list_id, user_id))
}

fn parse_args<T: for<'de> Deserialize<'de>>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidInput(e.to_string()))
}

fn upstream(e: StoreError) -> ToolError {
    ToolError::Upstream(e.to_string())
}

fn numbered(record: &TodoRecord, index: usize) -> Value {
    let mut value = json!(record);
    value["position"] = json!(index + 1);
    value
}

fn priority_schema() -> Value {
    json!({"type": "string", "enum": ["low", "medium", "high"]})
}

/// Create a new todo under the session's list.
pub struct CreateTodoTool {
    session: Arc<SessionRouter>,
    store: Arc<dyn RecordStore>,
}

impl CreateTodoTool {
    #[must_use]
    pub fn new(session: Arc<SessionRouter>, store: Arc<dyn RecordStore>) -> Self {
        Self { session, store }
    }
}

#[async_trait]
impl Tool for CreateTodoTool {
    fn name(&self) -> &'static str {
        "create_todo"
    }

    fn description(&self) -> &'static str {
        "Creates a new todo item in the current session's list. Automatically sets \
         completed=false. Required: title. Optional: description, priority \
         (low/medium/high), due_date, tags, project_id."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {"type": "string", "description": "Task title"},
                "description": {"type": "string", "description": "Task description"},
                "priority": priority_schema(),
                "due_date": {"type": "string", "description": "Due date (RFC 3339)"},
                "tags": {"type": "array", "items": {"type": "string"}},
                "project_id": {"type": "string"}
            },
            "required": ["title"]
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let new: NewTodo = parse_args(args)?;
        if new.title.trim().is_empty() {
            return Err(ToolError::InvalidInput("title must not be empty".to_string()));
        }

        let (list_id, user_id) = ambient_scope(&self.session)?;
        let title = new.title.clone();
        let record = self
            .store
            .create(&user_id, &list_id, new)
            .await
            .map_err(upstream)?;

        Ok(ToolOutput::json(&json!({
            "success": true,
            "operation": "create",
            "data": {"todo": record},
            "message": format!("Task \"{title}\" created"),
        })))
    }
}

#[derive(Debug, Deserialize)]
struct ReadTodosInput {
    limit: Option<usize>,
}

/// List todos under the session's list.
pub struct ReadTodosTool {
    session: Arc<SessionRouter>,
    store: Arc<dyn RecordStore>,
}

impl ReadTodosTool {
    #[must_use]
    pub fn new(session: Arc<SessionRouter>, store: Arc<dyn RecordStore>) -> Self {
        Self { session, store }
    }
}

#[async_trait]
impl Tool for ReadTodosTool {
    fn name(&self) -> &'static str {
        "read_todos"
    }

    fn description(&self) -> &'static str {
        "Retrieves todos from the current session's list. Returns all todos, or the \
         most recently created ones when a limit is given. Excludes deleted items. \
         Optional: limit (1-100)."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": 100,
                    "description": "Number of most recent todos to return"
                }
            }
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: ReadTodosInput = parse_args(args)?;
        if let Some(limit) = input.limit {
            if !(1..=100).contains(&limit) {
                return Err(ToolError::InvalidInput(
                    "limit must be between 1 and 100".to_string(),
                ));
            }
        }

        let (list_id, user_id) = ambient_scope(&self.session)?;
        let records = self
            .store
            .list(&user_id, &list_id, input.limit)
            .await
            .map_err(upstream)?;

        let todos: Vec<Value> = records
            .iter()
            .enumerate()
            .map(|(i, r)| numbered(r, i))
            .collect();
        let count = todos.len();

        Ok(ToolOutput::json(&json!({
            "success": true,
            "operation": "read",
            "data": {"todos": todos, "count": count},
            "message": format!("Found {count} tasks"),
        })))
    }
}

#[derive(Debug, Deserialize)]
struct UpdateTodoInput {
    todo_id: String,
    title: Option<String>,
    description: Option<String>,
    completed: Option<bool>,
    priority: Option<Priority>,
    due_date: Option<String>,
    tags: Option<Vec<String>>,
    project_id: Option<String>,
}

/// Update fields of an existing todo.
pub struct UpdateTodoTool {
    session: Arc<SessionRouter>,
    store: Arc<dyn RecordStore>,
}

impl UpdateTodoTool {
    #[must_use]
    pub fn new(session: Arc<SessionRouter>, store: Arc<dyn RecordStore>) -> Self {
        Self { session, store }
    }
}

#[async_trait]
impl Tool for UpdateTodoTool {
    fn name(&self) -> &'static str {
        "update_todo"
    }

    fn description(&self) -> &'static str {
        "Updates an existing todo item. Only the supplied fields change. Required: \
         todo_id. Optional: title, description, completed, priority, due_date, tags, \
         project_id."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "todo_id": {"type": "string", "description": "Id of the todo to update"},
                "title": {"type": "string"},
                "description": {"type": "string"},
                "completed": {"type": "boolean"},
                "priority": priority_schema(),
                "due_date": {"type": "string"},
                "tags": {"type": "array", "items": {"type": "string"}},
                "project_id": {"type": "string"}
            },
            "required": ["todo_id"]
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: UpdateTodoInput = parse_args(args)?;
        let (_list_id, user_id) = ambient_scope(&self.session)?;

        let patch = TodoPatch {
            title: input.title,
            description: input.description,
            completed: input.completed,
            priority: input.priority,
            due_date: input.due_date,
            tags: input.tags,
            project_id: input.project_id,
        };

        let record = self
            .store
            .update(&user_id, &input.todo_id, patch)
            .await
            .map_err(upstream)?;

        Ok(ToolOutput::json(&json!({
            "success": true,
            "operation": "update",
            "data": {"todo": record},
            "message": format!("Task \"{}\" updated", record.title),
        })))
    }
}

#[derive(Debug, Deserialize)]
struct DeleteTodoInput {
    todo_id: String,
}

/// Soft-delete a todo.
pub struct DeleteTodoTool {
    session: Arc<SessionRouter>,
    store: Arc<dyn RecordStore>,
}

impl DeleteTodoTool {
    #[must_use]
    pub fn new(session: Arc<SessionRouter>, store: Arc<dyn RecordStore>) -> Self {
        Self { session, store }
    }
}

#[async_trait]
impl Tool for DeleteTodoTool {
    fn name(&self) -> &'static str {
        "delete_todo"
    }

    fn description(&self) -> &'static str {
        "Deletes a todo item (soft delete; the record is hidden, not destroyed). \
         Required: todo_id."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "todo_id": {"type": "string", "description": "Id of the todo to delete"}
            },
            "required": ["todo_id"]
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: DeleteTodoInput = parse_args(args)?;
        let (_list_id, user_id) = ambient_scope(&self.session)?;

        let record = self
            .store
            .soft_delete(&user_id, &input.todo_id)
            .await
            .map_err(upstream)?;

        Ok(ToolOutput::json(&json!({
            "success": true,
            "operation": "delete",
            "data": {"todo_id": record.id},
            "message": format!("Task \"{}\" deleted", record.title),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRecordStore;
    use toolbridge_session::ConnectionParams;

    fn scoped_session() -> Arc<SessionRouter> {
        let session = Arc::new(SessionRouter::default());
        session.open_session(ConnectionParams {
            list_id: Some("L1".to_string()),
            agent_id: None,
            user_id: Some("U1".to_string()),
        });
        session
    }

    fn output_json(out: &ToolOutput) -> Value {
        let toolbridge_core::ToolContent::Text { text } = &out.content[0];
        serde_json::from_str(text).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_read_roundtrip() {
        let session = scoped_session();
        let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());

        let create = CreateTodoTool::new(Arc::clone(&session), Arc::clone(&store));
        let out = create
            .call(json!({"title": "write tests", "priority": "high"}))
            .await
            .unwrap();
        let payload = output_json(&out);
        assert_eq!(payload["success"], true);
        assert_eq!(payload["data"]["todo"]["priority"], "high");

        let read = ReadTodosTool::new(session, store);
        let out = read.call(json!({})).await.unwrap();
        let payload = output_json(&out);
        assert_eq!(payload["data"]["count"], 1);
        assert_eq!(payload["data"]["todos"][0]["position"], 1);
    }

    #[tokio::test]
    async fn test_create_without_session_is_not_configured() {
        let session = Arc::new(SessionRouter::default());
        let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());

        let create = CreateTodoTool::new(session, store);
        let err = create.call(json!({"title": "orphan"})).await.unwrap_err();
        assert!(matches!(err, ToolError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let session = scoped_session();
        let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());

        let create = CreateTodoTool::new(Arc::clone(&session), Arc::clone(&store));
        let out = create.call(json!({"title": "draft"})).await.unwrap();
        let id = output_json(&out)["data"]["todo"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let update = UpdateTodoTool::new(Arc::clone(&session), Arc::clone(&store));
        let out = update
            .call(json!({"todo_id": id, "completed": true}))
            .await
            .unwrap();
        assert_eq!(output_json(&out)["data"]["todo"]["completed"], true);

        let delete = DeleteTodoTool::new(Arc::clone(&session), Arc::clone(&store));
        delete.call(json!({"todo_id": id})).await.unwrap();

        let read = ReadTodosTool::new(session, store);
        let out = read.call(json!({})).await.unwrap();
        assert_eq!(output_json(&out)["data"]["count"], 0);
    }

    #[tokio::test]
    async fn test_read_rejects_out_of_range_limit() {
        let session = scoped_session();
        let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());

        let read = ReadTodosTool::new(session, store);
        let err = read.call(json!({"limit": 0})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_records_scoped_to_ambient_list() {
        let session = Arc::new(SessionRouter::default());
        session.open_session(ConnectionParams {
            list_id: Some("L1".to_string()),
            agent_id: None,
            user_id: Some("U1".to_string()),
        });
        let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());

        let create = CreateTodoTool::new(Arc::clone(&session), Arc::clone(&store));
        create.call(json!({"title": "in L1"})).await.unwrap();

        // A later session with a different list sees nothing.
        session.open_session(ConnectionParams {
            list_id: Some("L2".to_string()),
            agent_id: None,
            user_id: Some("U1".to_string()),
        });
        let read = ReadTodosTool::new(session, store);
        let out = read.call(json!({})).await.unwrap();
        assert_eq!(output_json(&out)["data"]["count"], 0);
    }
}
