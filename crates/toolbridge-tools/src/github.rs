//! GitHub REST API client and the issue/PR/workflow tools.
//!
//! All tools operate on the single repository named in the configuration.
//! Without a token they stay registered and report a not-configured error
//! when called.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use toolbridge_core::{Tool, ToolError, ToolOutput};

const GITHUB_API_URL: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// GitHub credentials and target repository.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub token: String,
    pub owner: String,
    pub repo: String,
}

/// GitHub client error.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("GitHub API error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// Thin client for the GitHub REST API, scoped to one repository.
pub struct GitHubClient {
    config: GitHubConfig,
    http: reqwest::Client,
}

impl GitHubClient {
    /// Create a client from credentials.
    #[must_use]
    pub fn new(config: GitHubConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Value, GitHubError> {
        let url = format!(
            "{GITHUB_API_URL}/repos/{}/{}{path}",
            self.config.owner, self.config.repo
        );

        let mut request = self
            .http
            .request(method, &url)
            .bearer_auth(&self.config.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .header("User-Agent", "toolbridge")
            .query(query);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v["message"].as_str().map(str::to_string))
                .unwrap_or(text);
            return Err(GitHubError::Api {
                status: status.as_u16(),
                message,
            });
        }

        // Some endpoints (rerun, cancel) return an empty body on success.
        if text.trim().is_empty() {
            return Ok(json!({"ok": true}));
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    /// Fetch an issue by number.
    pub async fn get_issue(&self, number: u64) -> Result<Value, GitHubError> {
        self.request(reqwest::Method::GET, &format!("/issues/{number}"), &[], None)
            .await
    }

    /// List repository issues.
    pub async fn list_issues(&self, state: &str, per_page: u8) -> Result<Value, GitHubError> {
        self.request(
            reqwest::Method::GET,
            "/issues",
            &[("state", state.to_string()), ("per_page", per_page.to_string())],
            None,
        )
        .await
    }

    /// Update an issue's title, body, or state.
    pub async fn update_issue(
        &self,
        number: u64,
        updates: Value,
    ) -> Result<Value, GitHubError> {
        self.request(
            reqwest::Method::PATCH,
            &format!("/issues/{number}"),
            &[],
            Some(updates),
        )
        .await
    }

    /// Add a comment to an issue.
    pub async fn create_issue_comment(
        &self,
        number: u64,
        body: &str,
    ) -> Result<Value, GitHubError> {
        self.request(
            reqwest::Method::POST,
            &format!("/issues/{number}/comments"),
            &[],
            Some(json!({"body": body})),
        )
        .await
    }

    /// Fetch a pull request by number.
    pub async fn get_pull_request(&self, number: u64) -> Result<Value, GitHubError> {
        self.request(reqwest::Method::GET, &format!("/pulls/{number}"), &[], None)
            .await
    }

    /// Update a pull request's title, body, or state.
    pub async fn update_pull_request(
        &self,
        number: u64,
        updates: Value,
    ) -> Result<Value, GitHubError> {
        self.request(
            reqwest::Method::PATCH,
            &format!("/pulls/{number}"),
            &[],
            Some(updates),
        )
        .await
    }

    /// Add a comment to a pull request.
    ///
    /// Pull request conversation comments go through the issues endpoint.
    pub async fn create_pull_request_comment(
        &self,
        number: u64,
        body: &str,
    ) -> Result<Value, GitHubError> {
        self.create_issue_comment(number, body).await
    }

    /// List repository pull requests.
    pub async fn list_pull_requests(
        &self,
        state: &str,
        per_page: u8,
    ) -> Result<Value, GitHubError> {
        self.request(
            reqwest::Method::GET,
            "/pulls",
            &[("state", state.to_string()), ("per_page", per_page.to_string())],
            None,
        )
        .await
    }

    /// List workflow runs, optionally filtered by status.
    pub async fn list_workflow_runs(
        &self,
        status: Option<&str>,
        per_page: u8,
        page: u32,
    ) -> Result<Value, GitHubError> {
        let mut query = vec![
            ("per_page", per_page.to_string()),
            ("page", page.to_string()),
        ];
        if let Some(status) = status {
            query.push(("status", status.to_string()));
        }
        self.request(reqwest::Method::GET, "/actions/runs", &query, None)
            .await
    }

    /// Fetch one workflow run's status.
    pub async fn get_workflow_run(&self, run_id: u64) -> Result<Value, GitHubError> {
        self.request(
            reqwest::Method::GET,
            &format!("/actions/runs/{run_id}"),
            &[],
            None,
        )
        .await
    }

    /// Fetch a workflow run together with its jobs.
    pub async fn get_workflow_run_details(
        &self,
        run_id: u64,
        per_page: u8,
        page: u32,
    ) -> Result<Value, GitHubError> {
        let run = self.get_workflow_run(run_id).await?;
        let jobs = self
            .request(
                reqwest::Method::GET,
                &format!("/actions/runs/{run_id}/jobs"),
                &[("per_page", per_page.to_string()), ("page", page.to_string())],
                None,
            )
            .await?;
        Ok(json!({"run": run, "jobs": jobs}))
    }

    /// Re-run a workflow run, either fully or only its failed jobs.
    pub async fn rerun_workflow_run(
        &self,
        run_id: u64,
        failed_jobs_only: bool,
    ) -> Result<Value, GitHubError> {
        let action = if failed_jobs_only {
            "rerun-failed-jobs"
        } else {
            "rerun"
        };
        self.request(
            reqwest::Method::POST,
            &format!("/actions/runs/{run_id}/{action}"),
            &[],
            None,
        )
        .await
    }

    /// Cancel an in-progress workflow run.
    pub async fn cancel_workflow_run(&self, run_id: u64) -> Result<Value, GitHubError> {
        self.request(
            reqwest::Method::POST,
            &format!("/actions/runs/{run_id}/cancel"),
            &[],
            None,
        )
        .await
    }
}

fn require(client: Option<&Arc<GitHubClient>>) -> Result<&GitHubClient, ToolError> {
    client.map(Arc::as_ref).ok_or_else(|| {
        ToolError::NotConfigured("GITHUB_TOKEN, GITHUB_OWNER and GITHUB_REPO must be set".to_string())
    })
}

fn parse_args<T: for<'de> Deserialize<'de>>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidInput(e.to_string()))
}

fn api_result(result: Result<Value, GitHubError>) -> Result<ToolOutput, ToolError> {
    let value = result.map_err(|e| ToolError::Upstream(e.to_string()))?;
    Ok(ToolOutput::json(&value))
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum IssueState {
    #[default]
    Open,
    Closed,
    All,
}

impl IssueState {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::All => "all",
        }
    }
}

fn state_schema() -> Value {
    json!({"type": "string", "enum": ["open", "closed", "all"]})
}

fn per_page_schema() -> Value {
    json!({"type": "integer", "minimum": 1, "maximum": 100})
}

/// Fetch one issue.
pub struct GetIssueTool {
    client: Option<Arc<GitHubClient>>,
}

#[derive(Debug, Deserialize)]
struct IssueNumberInput {
    issue_number: u64,
}

#[async_trait]
impl Tool for GetIssueTool {
    fn name(&self) -> &'static str {
        "github_get_issue"
    }

    fn description(&self) -> &'static str {
        "Fetches a GitHub issue by number from the configured repository."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"issue_number": {"type": "integer"}},
            "required": ["issue_number"]
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: IssueNumberInput = parse_args(args)?;
        let client = require(self.client.as_ref())?;
        api_result(client.get_issue(input.issue_number).await)
    }
}

/// List issues.
pub struct ListIssuesTool {
    client: Option<Arc<GitHubClient>>,
}

#[derive(Debug, Deserialize)]
struct ListIssuesInput {
    #[serde(default)]
    state: IssueState,
    per_page: Option<u8>,
}

#[async_trait]
impl Tool for ListIssuesTool {
    fn name(&self) -> &'static str {
        "github_list_issues"
    }

    fn description(&self) -> &'static str {
        "Lists GitHub issues in the configured repository. Optional: state \
         (open/closed/all, defaults to open), per_page (1-100, defaults to 30)."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"state": state_schema(), "per_page": per_page_schema()}
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: ListIssuesInput = parse_args(args)?;
        let client = require(self.client.as_ref())?;
        api_result(
            client
                .list_issues(input.state.as_str(), input.per_page.unwrap_or(30))
                .await,
        )
    }
}

/// Update an issue.
pub struct UpdateIssueTool {
    client: Option<Arc<GitHubClient>>,
}

#[derive(Debug, Deserialize)]
struct UpdateIssueInput {
    issue_number: u64,
    title: Option<String>,
    body: Option<String>,
    state: Option<String>,
}

#[async_trait]
impl Tool for UpdateIssueTool {
    fn name(&self) -> &'static str {
        "github_update_issue"
    }

    fn description(&self) -> &'static str {
        "Updates a GitHub issue's title, body, or state (open/closed). Required: \
         issue_number."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "issue_number": {"type": "integer"},
                "title": {"type": "string"},
                "body": {"type": "string"},
                "state": {"type": "string", "enum": ["open", "closed"]}
            },
            "required": ["issue_number"]
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: UpdateIssueInput = parse_args(args)?;
        if let Some(state) = input.state.as_deref() {
            if state != "open" && state != "closed" {
                return Err(ToolError::InvalidInput(
                    "state must be open or closed".to_string(),
                ));
            }
        }

        let mut updates = json!({});
        if let Some(title) = input.title {
            updates["title"] = Value::String(title);
        }
        if let Some(body) = input.body {
            updates["body"] = Value::String(body);
        }
        if let Some(state) = input.state {
            updates["state"] = Value::String(state);
        }

        let client = require(self.client.as_ref())?;
        api_result(client.update_issue(input.issue_number, updates).await)
    }
}

/// Comment on an issue.
pub struct CreateIssueCommentTool {
    client: Option<Arc<GitHubClient>>,
}

#[derive(Debug, Deserialize)]
struct CreateIssueCommentInput {
    issue_number: u64,
    body: String,
}

#[async_trait]
impl Tool for CreateIssueCommentTool {
    fn name(&self) -> &'static str {
        "github_create_issue_comment"
    }

    fn description(&self) -> &'static str {
        "Adds a comment to a GitHub issue. Required: issue_number, body."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "issue_number": {"type": "integer"},
                "body": {"type": "string"}
            },
            "required": ["issue_number", "body"]
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: CreateIssueCommentInput = parse_args(args)?;
        let client = require(self.client.as_ref())?;
        api_result(
            client
                .create_issue_comment(input.issue_number, &input.body)
                .await,
        )
    }
}

/// Fetch one pull request.
pub struct GetPullRequestTool {
    client: Option<Arc<GitHubClient>>,
}

#[derive(Debug, Deserialize)]
struct PullNumberInput {
    pull_number: u64,
}

#[async_trait]
impl Tool for GetPullRequestTool {
    fn name(&self) -> &'static str {
        "github_get_pull_request"
    }

    fn description(&self) -> &'static str {
        "Fetches a GitHub pull request by number from the configured repository."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"pull_number": {"type": "integer"}},
            "required": ["pull_number"]
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: PullNumberInput = parse_args(args)?;
        let client = require(self.client.as_ref())?;
        api_result(client.get_pull_request(input.pull_number).await)
    }
}

/// Update a pull request.
pub struct UpdatePullRequestTool {
    client: Option<Arc<GitHubClient>>,
}

#[derive(Debug, Deserialize)]
struct UpdatePullRequestInput {
    pull_number: u64,
    title: Option<String>,
    body: Option<String>,
    state: Option<String>,
}

#[async_trait]
impl Tool for UpdatePullRequestTool {
    fn name(&self) -> &'static str {
        "github_update_pull_request"
    }

    fn description(&self) -> &'static str {
        "Updates a GitHub pull request's title, body, or state (open/closed). \
         Required: pull_number."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pull_number": {"type": "integer"},
                "title": {"type": "string"},
                "body": {"type": "string"},
                "state": {"type": "string", "enum": ["open", "closed"]}
            },
            "required": ["pull_number"]
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: UpdatePullRequestInput = parse_args(args)?;
        if let Some(state) = input.state.as_deref() {
            if state != "open" && state != "closed" {
                return Err(ToolError::InvalidInput(
                    "state must be open or closed".to_string(),
                ));
            }
        }

        let mut updates = json!({});
        if let Some(title) = input.title {
            updates["title"] = Value::String(title);
        }
        if let Some(body) = input.body {
            updates["body"] = Value::String(body);
        }
        if let Some(state) = input.state {
            updates["state"] = Value::String(state);
        }

        let client = require(self.client.as_ref())?;
        api_result(client.update_pull_request(input.pull_number, updates).await)
    }
}

/// Comment on a pull request.
pub struct CreatePullRequestCommentTool {
    client: Option<Arc<GitHubClient>>,
}

#[derive(Debug, Deserialize)]
struct CreatePullRequestCommentInput {
    pull_number: u64,
    body: String,
}

#[async_trait]
impl Tool for CreatePullRequestCommentTool {
    fn name(&self) -> &'static str {
        "github_create_pull_request_comment"
    }

    fn description(&self) -> &'static str {
        "Adds a comment to a GitHub pull request's conversation. Required: \
         pull_number, body."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pull_number": {"type": "integer"},
                "body": {"type": "string"}
            },
            "required": ["pull_number", "body"]
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: CreatePullRequestCommentInput = parse_args(args)?;
        let client = require(self.client.as_ref())?;
        api_result(
            client
                .create_pull_request_comment(input.pull_number, &input.body)
                .await,
        )
    }
}

/// List pull requests.
pub struct ListPullRequestsTool {
    client: Option<Arc<GitHubClient>>,
}

#[async_trait]
impl Tool for ListPullRequestsTool {
    fn name(&self) -> &'static str {
        "github_list_pull_requests"
    }

    fn description(&self) -> &'static str {
        "Lists GitHub pull requests in the configured repository. Optional: state \
         (open/closed/all, defaults to open), per_page (1-100, defaults to 30)."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"state": state_schema(), "per_page": per_page_schema()}
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: ListIssuesInput = parse_args(args)?;
        let client = require(self.client.as_ref())?;
        api_result(
            client
                .list_pull_requests(input.state.as_str(), input.per_page.unwrap_or(30))
                .await,
        )
    }
}

/// List workflow runs.
pub struct ListWorkflowRunsTool {
    client: Option<Arc<GitHubClient>>,
}

#[derive(Debug, Deserialize)]
struct ListWorkflowRunsInput {
    status: Option<String>,
    per_page: Option<u8>,
    page: Option<u32>,
}

#[async_trait]
impl Tool for ListWorkflowRunsTool {
    fn name(&self) -> &'static str {
        "github_list_workflow_runs"
    }

    fn description(&self) -> &'static str {
        "Lists GitHub Actions workflow runs in the configured repository. Optional: \
         status (e.g. completed, in_progress, queued, failure, success), per_page, \
         page."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "status": {"type": "string"},
                "per_page": per_page_schema(),
                "page": {"type": "integer", "minimum": 1}
            }
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: ListWorkflowRunsInput = parse_args(args)?;
        let client = require(self.client.as_ref())?;
        api_result(
            client
                .list_workflow_runs(
                    input.status.as_deref(),
                    input.per_page.unwrap_or(30),
                    input.page.unwrap_or(1),
                )
                .await,
        )
    }
}

/// Fetch one workflow run.
pub struct GetWorkflowRunTool {
    client: Option<Arc<GitHubClient>>,
}

#[derive(Debug, Deserialize)]
struct GetWorkflowRunInput {
    run_id: u64,
}

#[async_trait]
impl Tool for GetWorkflowRunTool {
    fn name(&self) -> &'static str {
        "github_get_workflow_run"
    }

    fn description(&self) -> &'static str {
        "Fetches the status of a GitHub Actions workflow run. Required: run_id."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"run_id": {"type": "integer"}},
            "required": ["run_id"]
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: GetWorkflowRunInput = parse_args(args)?;
        let client = require(self.client.as_ref())?;
        api_result(client.get_workflow_run(input.run_id).await)
    }
}

/// Fetch a workflow run with its jobs.
pub struct GetWorkflowRunDetailsTool {
    client: Option<Arc<GitHubClient>>,
}

#[derive(Debug, Deserialize)]
struct GetWorkflowRunDetailsInput {
    run_id: u64,
    per_page: Option<u8>,
    page: Option<u32>,
}

#[async_trait]
impl Tool for GetWorkflowRunDetailsTool {
    fn name(&self) -> &'static str {
        "github_get_workflow_run_details"
    }

    fn description(&self) -> &'static str {
        "Fetches a GitHub Actions workflow run together with its jobs. Required: \
         run_id. Optional: per_page, page (for the job list)."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "run_id": {"type": "integer"},
                "per_page": per_page_schema(),
                "page": {"type": "integer", "minimum": 1}
            },
            "required": ["run_id"]
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: GetWorkflowRunDetailsInput = parse_args(args)?;
        let client = require(self.client.as_ref())?;
        api_result(
            client
                .get_workflow_run_details(
                    input.run_id,
                    input.per_page.unwrap_or(30),
                    input.page.unwrap_or(1),
                )
                .await,
        )
    }
}

/// Re-run a workflow run.
pub struct RerunWorkflowRunTool {
    client: Option<Arc<GitHubClient>>,
}

#[derive(Debug, Deserialize)]
struct RerunWorkflowRunInput {
    run_id: u64,
    #[serde(default)]
    failed_jobs_only: bool,
}

#[async_trait]
impl Tool for RerunWorkflowRunTool {
    fn name(&self) -> &'static str {
        "github_rerun_workflow_run"
    }

    fn description(&self) -> &'static str {
        "Re-runs a GitHub Actions workflow run. Required: run_id. Optional: \
         failed_jobs_only (re-run only the jobs that failed)."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "run_id": {"type": "integer"},
                "failed_jobs_only": {"type": "boolean"}
            },
            "required": ["run_id"]
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: RerunWorkflowRunInput = parse_args(args)?;
        let client = require(self.client.as_ref())?;
        api_result(
            client
                .rerun_workflow_run(input.run_id, input.failed_jobs_only)
                .await,
        )
    }
}

/// Cancel a workflow run.
pub struct CancelWorkflowRunTool {
    client: Option<Arc<GitHubClient>>,
}

#[async_trait]
impl Tool for CancelWorkflowRunTool {
    fn name(&self) -> &'static str {
        "github_cancel_workflow_run"
    }

    fn description(&self) -> &'static str {
        "Cancels an in-progress GitHub Actions workflow run. Required: run_id."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"run_id": {"type": "integer"}},
            "required": ["run_id"]
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: RerunWorkflowRunInput = parse_args(args)?;
        let client = require(self.client.as_ref())?;
        api_result(client.cancel_workflow_run(input.run_id).await)
    }
}

/// All GitHub tools, sharing one client.
#[must_use]
pub fn github_tools(client: Option<Arc<GitHubClient>>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(GetIssueTool {
            client: client.clone(),
        }),
        Arc::new(ListIssuesTool {
            client: client.clone(),
        }),
        Arc::new(UpdateIssueTool {
            client: client.clone(),
        }),
        Arc::new(CreateIssueCommentTool {
            client: client.clone(),
        }),
        Arc::new(GetPullRequestTool {
            client: client.clone(),
        }),
        Arc::new(UpdatePullRequestTool {
            client: client.clone(),
        }),
        Arc::new(CreatePullRequestCommentTool {
            client: client.clone(),
        }),
        Arc::new(ListPullRequestsTool {
            client: client.clone(),
        }),
        Arc::new(ListWorkflowRunsTool {
            client: client.clone(),
        }),
        Arc::new(GetWorkflowRunTool {
            client: client.clone(),
        }),
        Arc::new(GetWorkflowRunDetailsTool {
            client: client.clone(),
        }),
        Arc::new(RerunWorkflowRunTool {
            client: client.clone(),
        }),
        Arc::new(CancelWorkflowRunTool { client }),
    ]
}
