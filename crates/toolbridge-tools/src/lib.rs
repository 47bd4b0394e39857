//! Built-in tools for the toolbridge server.
//!
//! The tool set is fixed per deployment: [`builtin_tools`] assembles the
//! full registry at startup. Tools that need upstream credentials
//! (Telegram, GitHub) are registered either way and report a
//! not-configured error when called without them.

pub mod calculator;
pub mod github;
pub mod http;
pub mod registry;
pub mod sql;
pub mod store;
pub mod telegram;
pub mod todo;

use std::sync::Arc;

use toolbridge_session::SessionRouter;

pub use github::{GitHubClient, GitHubConfig};
pub use registry::ToolRegistry;
pub use store::{MemoryRecordStore, RecordStore, TodoRecord};
pub use telegram::{TelegramClient, TelegramConfig};

/// Assemble the registry of all built-in tools.
#[must_use]
pub fn builtin_tools(
    session: Arc<SessionRouter>,
    store: Arc<dyn RecordStore>,
    telegram: Option<TelegramConfig>,
    github: Option<GitHubConfig>,
) -> ToolRegistry {
    let telegram = telegram.map(|c| Arc::new(TelegramClient::new(c)));
    let github = github.map(|c| Arc::new(GitHubClient::new(c)));

    let mut tools: Vec<Arc<dyn toolbridge_core::Tool>> = vec![
        Arc::new(todo::CreateTodoTool::new(
            Arc::clone(&session),
            Arc::clone(&store),
        )),
        Arc::new(todo::ReadTodosTool::new(
            Arc::clone(&session),
            Arc::clone(&store),
        )),
        Arc::new(todo::UpdateTodoTool::new(
            Arc::clone(&session),
            Arc::clone(&store),
        )),
        Arc::new(todo::DeleteTodoTool::new(session, store)),
        Arc::new(calculator::CalculatorTool),
        Arc::new(sql::ExecuteSqlTool),
        Arc::new(http::HttpRequestTool::new()),
        Arc::new(telegram::SendTelegramMessageTool::new(telegram)),
    ];
    tools.extend(github::github_tools(github));

    ToolRegistry::new(tools)
}
