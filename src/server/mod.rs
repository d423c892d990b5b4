//! HTTP surface: cut submission, live progress over SSE, status snapshot

use std::convert::Infallible;
use std::path::{Path, PathBuf};

use axum::{
    body::Bytes,
    extract::State,
    http::{header, Method, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::app::{CutOrchestrator, CutRequest};
use crate::domain::model::{DeleteRequest, OutputFormat, TimeRange};
use crate::error::{CutXError, CutXResult};
use crate::events::ProgressEvent;
use crate::utils::path::absolutize;

/// Shared handler state
#[derive(Clone)]
pub struct ServerState {
    orchestrator: CutOrchestrator,
    /// The only file this server cuts
    source: Option<PathBuf>,
}

impl ServerState {
    pub fn new(orchestrator: CutOrchestrator, source: Option<PathBuf>) -> Self {
        Self {
            orchestrator,
            source,
        }
    }
}

/// Accepted body shapes of `POST /api/cut`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CutPayload {
    Wrapped {
        segments: Vec<TimeRange>,
        #[serde(default)]
        format: Option<String>,
        #[serde(default)]
        source: Option<PathBuf>,
    },
    /// Legacy form: just the delete list
    Bare(Vec<TimeRange>),
}

/// Parsed cut submission
#[derive(Debug, Clone, PartialEq)]
pub struct CutSubmission {
    pub deletes: DeleteRequest,
    pub format: OutputFormat,
    pub source: Option<PathBuf>,
}

/// Parse a request body, validating every range and the format
pub fn parse_submission(body: &[u8]) -> CutXResult<CutSubmission> {
    let payload: CutPayload = serde_json::from_slice(body).map_err(|e| {
        CutXError::validation(format!(
            "expected {{\"segments\": [{{\"start\", \"end\"}}...], \"format\"}} or a bare array: {}",
            e
        ))
    })?;

    Ok(match payload {
        CutPayload::Wrapped {
            segments,
            format,
            source,
        } => CutSubmission {
            deletes: segments,
            format: format
                .as_deref()
                .map(str::parse::<OutputFormat>)
                .transpose()?
                .unwrap_or_default(),
            source,
        },
        CutPayload::Bare(segments) => CutSubmission {
            deletes: segments,
            format: OutputFormat::default(),
            source: None,
        },
    })
}

#[derive(Debug, Serialize)]
struct CutResponse {
    success: bool,
    job_id: String,
    output: PathBuf,
    format: OutputFormat,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(error: CutXError) -> ApiError {
    let status = match &error {
        CutXError::InvalidRange { .. } | CutXError::Validation { .. } | CutXError::Json(_) => {
            StatusCode::BAD_REQUEST
        }
        CutXError::JobInFlight { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(status = status.as_u16(), "Cut request rejected: {}", error);
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: error.to_string(),
        }),
    )
}

async fn submit_cut(
    State(state): State<ServerState>,
    body: Bytes,
) -> Result<Json<CutResponse>, ApiError> {
    let submission = parse_submission(&body).map_err(api_error)?;
    let source = resolve_source(state.source.as_deref(), submission.source.as_deref())
        .map_err(api_error)?;

    let segments = submission.deletes.len();
    let accepted = state
        .orchestrator
        .submit(CutRequest::new(source, submission.deletes, submission.format))
        .map_err(api_error)?;

    Ok(Json(CutResponse {
        success: true,
        message: format!("cutting {} segment(s), follow /api/progress", segments),
        job_id: accepted.job_id,
        output: accepted.output,
        format: accepted.format,
    }))
}

/// The configured source; a body may repeat it but never name another file
fn resolve_source(configured: Option<&Path>, requested: Option<&Path>) -> CutXResult<PathBuf> {
    let configured =
        configured.ok_or_else(|| CutXError::validation("no source file configured"))?;
    if let Some(requested) = requested {
        if absolutize(requested)? != absolutize(configured)? {
            return Err(CutXError::validation(format!(
                "source is fixed to {}; requests cannot name another file",
                configured.display()
            )));
        }
    }
    Ok(configured.to_path_buf())
}

fn sse_event(event: &ProgressEvent) -> Event {
    Event::default()
        .json_data(event)
        .unwrap_or_else(|_| Event::default().comment("unserializable event"))
}

async fn progress_stream(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.orchestrator.hub().subscribe();
    info!(subscriber = ?subscription.id(), "Progress stream opened");
    let stream = subscription
        .into_stream()
        .map(|event| Ok::<_, Infallible>(sse_event(&event)));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn status(State(state): State<ServerState>) -> Json<Option<ProgressEvent>> {
    Json(state.orchestrator.hub().latest())
}

/// The review page is served from another origin
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/api/cut", post(submit_cut))
        .route("/api/progress", get(progress_stream))
        .route("/api/status", get(status))
        .layer(cors_layer())
        .with_state(state)
}

/// Serve until Ctrl-C
pub async fn serve(state: ServerState, addr: &str, port: u16) -> CutXResult<()> {
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", addr, port)).await?;
    info!("Listening at {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}
