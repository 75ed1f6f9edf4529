//! HTTP/SSE transport for the §6.1 RPC surface: a thin axum `Router`
//! exposing one route per operation, grounded on the teacher's
//! `HttpTransport` (bind config, `axum::serve` with graceful shutdown,
//! SSE via `axum::response::sse::{Event, Sse}`) but without the MCP
//! session/JSON-RPC envelope — every route here is a plain typed
//! request/response, with `Search` alone streaming over SSE per spec
//! §6.2.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    response::sse::{Event as SseEvent, Sse},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vantage_core::{EngineError, Event};

use super::types::{
    ErrorBody, FeedbackRequest, GetSessionResponse, HealthResponse, IndexDirectoryRequest, IndexDirectoryResponse, IndexFileRequest,
    IndexFileResponse, ListDocumentsQuery, ListDocumentsResponse, SearchRequest, WatcherAddPathRequest, WatcherRemovePathRequest,
    WatcherStatusResponse,
};
use crate::server::VantageServer;

pub struct HttpTransportConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8420 }
    }
}

pub struct HttpTransport {
    config: HttpTransportConfig,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Self {
        Self { config }
    }

    pub async fn run(self, server: Arc<VantageServer>) -> Result<(), std::io::Error> {
        let app = build_router(server);

        let addr: SocketAddr =
            format!("{}:{}", self.config.host, self.config.port).parse().map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        info!("vantage-server listening on http://{addr}");
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
        info!("vantage-server shutting down");
        Ok(())
    }
}

pub fn build_router(server: Arc<VantageServer>) -> Router {
    Router::new()
        .route("/search", post(handle_search))
        .route("/index/directory", post(handle_index_directory))
        .route("/index/file", post(handle_index_file))
        .route("/documents", get(handle_list_documents))
        .route("/documents/{id}", get(handle_get_document))
        .route("/documents/{id}", delete(handle_delete_document))
        .route("/sessions/{id}", get(handle_get_session))
        .route("/sessions/{id}", delete(handle_clear_session))
        .route("/feedback", post(handle_feedback))
        .route("/watcher/enable", post(handle_watcher_enable))
        .route("/watcher/disable", post(handle_watcher_disable))
        .route("/watcher/status", get(handle_watcher_status))
        .route("/watcher/paths", post(handle_watcher_add_path))
        .route("/watcher/paths", delete(handle_watcher_remove_path))
        .route("/health", get(handle_health))
        .with_state(server)
}

fn engine_error_response(e: EngineError) -> Response {
    let status = match &e {
        EngineError::InputInvalid(_) => StatusCode::BAD_REQUEST,
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Conflict(_) => StatusCode::CONFLICT,
        EngineError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        EngineError::Cancelled => StatusCode::BAD_REQUEST,
        EngineError::Retriable(_) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorBody { error: e.to_string(), kind: format!("{e:?}") })).into_response()
}

/// Cancels the request's [`CancellationToken`] once dropped, which happens
/// when the SSE stream it's bundled into is torn down — on completion, or
/// earlier, when the client disconnects mid-stream.
struct CancelOnDrop(CancellationToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// `POST /search`: runs the orchestrator and streams every `Event` as an
/// SSE frame, the `complete` event carrying the final result (spec §6.2).
/// A client disconnect drops the stream, cancelling the in-flight request
/// (spec §5) and terminating it with `error{kind:Cancelled}`.
async fn handle_search(State(server): State<Arc<VantageServer>>, Json(req): Json<SearchRequest>) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let (tx, rx) = mpsc::channel(server.services.config.workflow.event_channel_capacity.max(1));
    let cancellation = CancellationToken::new();
    let task_cancellation = cancellation.clone();
    tokio::spawn(async move {
        if let Err(e) = server.search(req, tx.clone(), task_cancellation).await {
            let _ = tx.send(Event::Error { kind: format!("{e:?}"), message: e.to_string() }).await;
        }
    });

    let guard = CancelOnDrop(cancellation);
    let stream = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        let event = rx.recv().await?;
        let frame = SseEvent::default().event(event_name(&event)).data(event.to_json());
        Some((Ok(frame), (rx, guard)))
    });
    Sse::new(stream)
}

fn event_name(event: &Event) -> &'static str {
    match event {
        Event::Step { .. } => "step",
        Event::PartialResults { .. } => "partial_results",
        Event::AnswerChunk { .. } => "answer_chunk",
        Event::Confidence { .. } => "confidence",
        Event::Graph { .. } => "graph",
        Event::Error { .. } => "error",
        Event::Complete { .. } => "complete",
    }
}

async fn handle_index_directory(State(server): State<Arc<VantageServer>>, Json(req): Json<IndexDirectoryRequest>) -> Json<IndexDirectoryResponse> {
    let report = server.index_directory(&req.path).await;
    Json(IndexDirectoryResponse { success: report.success, failed: report.failed, skipped: report.skipped })
}

async fn handle_index_file(State(server): State<Arc<VantageServer>>, Json(req): Json<IndexFileRequest>) -> Json<IndexFileResponse> {
    let response = match server.index_file(&req.path).await {
        vantage_core::ingestion::FileStatus::Indexed { doc_id } => IndexFileResponse { status: "indexed".into(), doc_id: Some(doc_id), reason: None },
        vantage_core::ingestion::FileStatus::Skipped { reason } => IndexFileResponse { status: "skipped".into(), doc_id: None, reason: Some(reason) },
        vantage_core::ingestion::FileStatus::Failed { error } => IndexFileResponse { status: "failed".into(), doc_id: None, reason: Some(error) },
    };
    Json(response)
}

async fn handle_list_documents(State(server): State<Arc<VantageServer>>, Query(q): Query<ListDocumentsQuery>) -> Response {
    match server.list_documents(q.limit.unwrap_or(50), q.offset.unwrap_or(0)).await {
        Ok(documents) => Json(ListDocumentsResponse { documents }).into_response(),
        Err(e) => engine_error_response(e),
    }
}

async fn handle_get_document(State(server): State<Arc<VantageServer>>, AxumPath(id): AxumPath<String>) -> Response {
    match server.get_document(&id).await {
        Ok(Some(doc)) => Json(doc).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, Json(ErrorBody { error: format!("document {id} not found"), kind: "NotFound".into() })).into_response(),
        Err(e) => engine_error_response(e),
    }
}

async fn handle_delete_document(State(server): State<Arc<VantageServer>>, AxumPath(id): AxumPath<String>) -> Response {
    match server.delete_document(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => engine_error_response(e),
    }
}

async fn handle_get_session(State(server): State<Arc<VantageServer>>, AxumPath(id): AxumPath<String>) -> Json<GetSessionResponse> {
    let session = server.get_session(&id, None).await;
    Json(GetSessionResponse { session_id: session.id, turns: session.turns.into_iter().collect() })
}

async fn handle_clear_session(State(server): State<Arc<VantageServer>>, AxumPath(id): AxumPath<String>) -> Response {
    server.clear_session(&id).await;
    StatusCode::NO_CONTENT.into_response()
}

async fn handle_feedback(State(server): State<Arc<VantageServer>>, Json(req): Json<FeedbackRequest>) -> Response {
    match server.feedback(req.user_id.as_deref(), &req.episode_id, req.rating, req.comment.as_deref()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => engine_error_response(e),
    }
}

async fn handle_watcher_enable(State(server): State<Arc<VantageServer>>) -> StatusCode {
    server.watcher_enable().await;
    StatusCode::NO_CONTENT
}

async fn handle_watcher_disable(State(server): State<Arc<VantageServer>>) -> StatusCode {
    server.watcher_disable().await;
    StatusCode::NO_CONTENT
}

async fn handle_watcher_status(State(server): State<Arc<VantageServer>>) -> Json<WatcherStatusResponse> {
    let status = server.watcher_status().await;
    Json(WatcherStatusResponse { enabled: status.enabled, watched_paths: status.watched_paths })
}

async fn handle_watcher_add_path(State(server): State<Arc<VantageServer>>, Json(req): Json<WatcherAddPathRequest>) -> Response {
    match server.watcher_add_path(&req.path).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => engine_error_response(e),
    }
}

async fn handle_watcher_remove_path(State(server): State<Arc<VantageServer>>, Json(req): Json<WatcherRemovePathRequest>) -> Response {
    let removed = server.watcher_remove_path(&req.path).await;
    if removed {
        StatusCode::NO_CONTENT.into_response()
    } else {
        let body: PathBuf = req.path;
        warn!(path = ?body, "watcher remove_path: path was not tracked");
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn handle_health(State(server): State<Arc<VantageServer>>) -> Json<HealthResponse> {
    Json(server.health().await)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).expect("failed to listen for SIGTERM").recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl+c, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
