//! HTTP control plane: introspect and drive a running kernel over a small
//! JSON API. Grounded in the teacher's stated intent for its own `axum`
//! dependency ("HTTP server and middleware, for HTTP Streamable
//! Transport") — this crate is the concrete transport the teacher's
//! workspace dependency table reserved a slot for but never wired up in
//! the modules this exercise drew from.

use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use slug_kernel::prelude::*;
use tower_http::trace::TraceLayer;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub kernel: Kernel,
}

/// Build the router. Kept separate from [`serve`] so integration tests can
/// drive it in-process without binding a socket.
pub fn router(kernel: Kernel) -> Router {
    let state = AppState { kernel };
    Router::new()
        .route("/actors", get(list_actors))
        .route("/actors/{id}", get(describe_actor))
        .route("/send", post(send_message))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(kernel: Kernel, addr: &str) -> std::io::Result<()> {
    let app = router(kernel);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "control plane listening");
    axum::serve(listener, app).await
}

/// Mirrors the `{id,name,ops,caps[],cpu,ipcIn,ipcOut}` shape (§6); `ops`
/// and `caps` are left for a future pass since the kernel's policy engine
/// keys off `TypeId`, not a human-readable operation name.
#[derive(Debug, Serialize)]
struct ActorSummary {
    id: u64,
    name: Option<String>,
    running: bool,
    cpu_micros: u64,
    ipc_in: u64,
    ipc_out: u64,
}

async fn list_actors(State(state): State<AppState>) -> Json<Vec<ActorSummary>> {
    let ids = state.kernel.actor_ids();
    let summaries = ids
        .into_iter()
        .filter_map(|id| {
            let (cpu_micros, ipc_in, ipc_out) = state.kernel.counters(id).ok()?;
            Some(ActorSummary {
                id: id.as_u64(),
                name: state.kernel.name_of(id),
                running: state.kernel.is_running(id),
                cpu_micros,
                ipc_in,
                ipc_out,
            })
        })
        .collect();
    Json(summaries)
}

#[derive(Debug, Serialize)]
struct ActorDetail {
    id: u64,
    name: Option<String>,
    running: bool,
    mailbox_len: usize,
    mailbox_capacity: usize,
    cpu_micros: u64,
    ipc_in: u64,
    ipc_out: u64,
}

async fn describe_actor(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ActorDetail>, ApiError> {
    let id = ActorId::from_raw(id);
    let (cpu_micros, ipc_in, ipc_out) = state.kernel.counters(id)?;
    Ok(Json(ActorDetail {
        id: id.as_u64(),
        name: state.kernel.name_of(id),
        running: state.kernel.is_running(id),
        mailbox_len: state.kernel.mailbox_len(id)?,
        mailbox_capacity: state.kernel.mailbox_capacity(id)?,
        cpu_micros,
        ipc_in,
        ipc_out,
    }))
}

/// A bare text payload exchanged over the HTTP control plane. Handlers
/// hosted through `slug-services` would register an `OperationMap` entry
/// for this type if they want to accept control-plane traffic directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlPlaneText(pub String);

#[derive(Debug, Deserialize)]
struct SendRequest {
    from: u64,
    to: u64,
    text: String,
}

#[derive(Debug, Serialize)]
struct SendResponse {
    reply: Option<String>,
}

/// `POST /send` attempts a synchronous send with a bounded timeout and
/// surfaces the reply, or `504` if none arrives in time (§6 "attempts a
/// synchronous send with a 3 s timeout; returns reply or 504").
const SEND_TIMEOUT: Duration = Duration::from_secs(3);

async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    let reply = state
        .kernel
        .send_sync(
            ActorId::from_raw(req.from),
            ActorId::from_raw(req.to),
            ControlPlaneText(req.text),
            SEND_TIMEOUT,
        )
        .await?;
    let reply = match reply.downcast::<ControlPlaneText>() {
        Ok(ControlPlaneText(text)) => Some(text),
        Err(_) => None,
    };
    Ok(Json(SendResponse { reply }))
}

/// Maps [`KernelError`] onto HTTP status codes for the JSON API.
pub struct ApiError(KernelError);

impl From<KernelError> for ApiError {
    fn from(err: KernelError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            KernelError::NoSuchActor(_) => StatusCode::NOT_FOUND,
            KernelError::PolicyDenied { .. } => StatusCode::FORBIDDEN,
            KernelError::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,
            KernelError::Deadline => StatusCode::GATEWAY_TIMEOUT,
            KernelError::Closed(_) => StatusCode::GONE,
            KernelError::InvalidPassive(_) => StatusCode::BAD_REQUEST,
        };
        (status, self.0.to_string()).into_response()
    }
}

/// Install the default global `tracing` subscriber, reading filter
/// directives from `RUST_LOG` (§6.1). Library crates in this workspace
/// only emit events; this binary-level setup is the one place a
/// subscriber is installed.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

/// Build a kernel with a small illustrative actor tree already spawned
/// under it, used by `main` and available to integration tests.
pub fn bootstrap_kernel(config: KernelConfig) -> Kernel {
    let kernel = Kernel::new(config);
    let _ = slug_services::stdout::spawn(&kernel, ActorId::KERNEL);
    let _ = slug_services::fileio::spawn(&kernel, ActorId::KERNEL);
    let _ = slug_services::lexer::spawn(&kernel, ActorId::KERNEL);
    let _ = slug_services::parser::spawn(&kernel, ActorId::KERNEL);
    let _ = slug_services::evaluator::spawn(&kernel, ActorId::KERNEL);
    kernel
}

pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
