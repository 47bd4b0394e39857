//! HTTP surface: the streamable endpoint and the info page.
//!
//! One endpoint carries the whole protocol: POST for requests, GET for
//! the server-to-client SSE stream, DELETE for explicit teardown. The
//! session id travels in the `mcp-session-id` header; connection
//! parameters ride as query parameters on the initialize request.

use std::{collections::HashMap, convert::Infallible, sync::Arc};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use futures::StreamExt;
use serde_json::json;
use tokio_stream::wrappers::UnboundedReceiverStream;
use toolbridge_core::protocol::{self, JsonRpcRequest, JsonRpcResponse};
use toolbridge_session::{ConnectionParams, DispatchOutcome, SessionRouter};
use tower_http::cors::CorsLayer;

use crate::service::McpService;

/// Header carrying the session id on every non-initialize request.
pub const SESSION_ID_HEADER: &str = "mcp-session-id";

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionRouter>,
    pub service: Arc<McpService>,
}

/// Build the application router.
#[must_use]
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route(
            "/mcp",
            get(stream_handler).post(message_handler).delete(close_handler),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn session_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn connection_params(query: &HashMap<String, String>) -> ConnectionParams {
    // Unrecognized keys are ignored; missing keys default to None.
    ConnectionParams {
        list_id: query.get("list_id").cloned(),
        agent_id: query.get("agent_id").cloned(),
        user_id: query.get("user_id").cloned(),
    }
}

fn protocol_error(status: StatusCode, message: impl Into<String>) -> Response {
    let body = JsonRpcResponse::error(None, protocol::SERVER_ERROR, message);
    (status, Json(body)).into_response()
}

async fn index_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let info = state.service.info();
    Json(json!({
        "name": info.name,
        "version": info.version,
        "status": "ready",
        "endpoints": {"mcp": "/mcp"},
        "tools": state.service.tool_count(),
        "sessions": state.session.session_count(),
    }))
}

async fn message_handler(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let Ok(request) = serde_json::from_str::<JsonRpcRequest>(&body) else {
        let response = JsonRpcResponse::error(None, protocol::PARSE_ERROR, "Parse error");
        return (StatusCode::BAD_REQUEST, Json(response)).into_response();
    };

    let session_id = session_header(&headers);
    let outcome = state.session.route_inbound(
        session_id.as_deref(),
        request.is_initialize(),
        connection_params(&query),
    );

    match outcome {
        Ok(DispatchOutcome::RoutedToExisting { .. }) => {
            match state.service.handle(request).await {
                Some(response) => Json(response).into_response(),
                None => StatusCode::ACCEPTED.into_response(),
            }
        }
        Ok(DispatchOutcome::CreatedNew { session_id }) => {
            let response = state.service.handle(request).await;
            let header = [(SESSION_ID_HEADER, session_id)];
            match response {
                Some(response) => (header, Json(response)).into_response(),
                None => (header, StatusCode::ACCEPTED).into_response(),
            }
        }
        Err(e) => {
            tracing::debug!(error = %e, "inbound message rejected");
            protocol_error(StatusCode::BAD_REQUEST, e.to_string())
        }
    }
}

/// Attach the server-to-client event stream for a session.
///
/// Request handling is synchronous request/response, so this stream
/// carries keep-alives only until something calls
/// `SessionRouter::send_to` for the session (server-initiated
/// notifications, progress updates).
async fn stream_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(session_id) = session_header(&headers) else {
        return protocol_error(StatusCode::BAD_REQUEST, "Invalid or missing session ID");
    };
    if !state.session.has_session(&session_id) {
        return protocol_error(StatusCode::BAD_REQUEST, "Invalid or missing session ID");
    }

    let Some(rx) = state.session.take_outbound(&session_id) else {
        return protocol_error(StatusCode::CONFLICT, "Stream already established");
    };

    tracing::info!(session_id = %session_id, "SSE stream opened");
    let stream = UnboundedReceiverStream::new(rx).map(|message| {
        Ok::<Event, Infallible>(Event::default().event("message").data(message.to_string()))
    });

    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}

async fn close_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(session_id) = session_header(&headers) else {
        return protocol_error(StatusCode::BAD_REQUEST, "Invalid or missing session ID");
    };
    if !state.session.has_session(&session_id) {
        return protocol_error(StatusCode::BAD_REQUEST, "Invalid or missing session ID");
    }

    state.session.close_session(&session_id);
    StatusCode::NO_CONTENT.into_response()
}
