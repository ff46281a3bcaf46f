//! HTTP control plane for the port allocation service.
//!
//! One coordinator process binds the fixed coordination port and serves a small
//! JSON API; every other CLI process on the machine is a client. The coordinator
//! is an explicitly constructed, explicitly owned object — no module-level
//! singleton — so tests can run isolated instances on ephemeral ports.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::HarborError;
use crate::ports::COORDINATION_PORT;
use crate::ports::registry::PortRegistry;

/// The port allocation coordination server.
///
/// Owns the registry and the cancellation token used for shutdown. `start()`
/// binds the coordination port and spawns the serve loop; a second `start()`
/// on the same object is rejected.
pub struct PortCoordinator {
    registry: Arc<PortRegistry>,
    port: u16,
    cancel: CancellationToken,
    started: AtomicBool,
}

/// Handle for a running coordination server.
pub struct RunningCoordinator {
    /// Actual bound address — differs from the configured port only when the
    /// coordinator was constructed with port 0 (tests).
    pub addr: SocketAddr,
    cancel: CancellationToken,
    task: JoinHandle<std::io::Result<()>>,
}

impl PortCoordinator {
    /// Coordinator on the well-known fixed coordination port.
    pub fn new() -> Self {
        Self::with_port(COORDINATION_PORT)
    }

    /// Coordinator on an arbitrary port. Port 0 asks the OS for an ephemeral
    /// port, which is how tests get isolated instances.
    pub fn with_port(port: u16) -> Self {
        Self {
            registry: Arc::new(PortRegistry::new()),
            port,
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Shared handle to the underlying registry.
    pub fn registry(&self) -> Arc<PortRegistry> {
        self.registry.clone()
    }

    /// Bind the coordination port and start serving the control plane.
    ///
    /// An `AddrInUse` bind failure maps to [`HarborError::CoordinatorRunning`]
    /// so the caller can report "another coordinator is already running" rather
    /// than a generic I/O error. Starting the same coordinator twice returns
    /// [`HarborError::AlreadyStarted`].
    pub async fn start(&self) -> crate::Result<RunningCoordinator> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(HarborError::AlreadyStarted);
        }

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, self.port))
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AddrInUse {
                    HarborError::CoordinatorRunning(self.port)
                } else {
                    HarborError::Io(e)
                }
            })?;
        let addr = listener.local_addr()?;

        let state = AppState {
            registry: self.registry.clone(),
            cancel: self.cancel.clone(),
        };
        let app = control_plane_router(state);

        let cancel = self.cancel.clone();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(cancel.cancelled_owned())
                .await
        });

        tracing::info!(port = addr.port(), "port coordination server listening");

        Ok(RunningCoordinator {
            addr,
            cancel: self.cancel.clone(),
            task,
        })
    }
}

impl Default for PortCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl RunningCoordinator {
    /// Token that fires when the server begins shutting down. Cloned by callers
    /// that wire the coordinator into Ctrl-C handling.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request shutdown: stop accepting connections, finish in-flight requests.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Wait for the serve loop to exit.
    pub async fn wait(self) -> crate::Result<()> {
        match self.task.await {
            Ok(result) => result.map_err(HarborError::Io),
            Err(e) => Err(HarborError::Io(std::io::Error::other(e))),
        }
    }
}

#[derive(Clone)]
struct AppState {
    registry: Arc<PortRegistry>,
    cancel: CancellationToken,
}

fn control_plane_router(state: AppState) -> Router {
    Router::new()
        .route("/servers", get(list_servers).post(assign_servers))
        .route(
            "/servers/:instance_id",
            get(get_server).delete(release_server),
        )
        .route("/close", post(close))
        .with_state(state)
}

// --- wire types ---

#[derive(Debug, Serialize)]
struct ListResponse {
    servers: std::collections::HashMap<String, u16>,
    count: usize,
}

#[derive(Debug, Serialize)]
struct GetResponse {
    port: u16,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignRequest {
    instance_ids: Vec<String>,
    port: Option<u32>,
}

#[derive(Debug, Serialize)]
struct AssignResponse {
    ports: Vec<u16>,
}

/// Wraps HarborError so control-plane handlers can map it to an HTTP status
/// code with a JSON `{ "error": msg }` body.
struct ControlPlaneError(HarborError);

impl IntoResponse for ControlPlaneError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            HarborError::InstanceNotFound(_) => StatusCode::NOT_FOUND,
            HarborError::PortConflict { .. } => StatusCode::CONFLICT,
            HarborError::PortOutOfRange(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

impl From<HarborError> for ControlPlaneError {
    fn from(e: HarborError) -> Self {
        Self(e)
    }
}

// --- handlers ---

async fn list_servers(State(state): State<AppState>) -> Json<ListResponse> {
    let servers = state.registry.list().await;
    let count = servers.len();
    Json(ListResponse { servers, count })
}

async fn get_server(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
) -> Result<Json<GetResponse>, ControlPlaneError> {
    match state.registry.get(&instance_id).await {
        Some(port) => Ok(Json(GetResponse { port })),
        None => Err(HarborError::InstanceNotFound(instance_id).into()),
    }
}

/// Batch assignment. Fresh ids are detected concurrently and recorded even when
/// other ids in the batch conflict; the response is 409 naming the first
/// conflicting instance and its existing port in that case.
async fn assign_servers(
    State(state): State<AppState>,
    Json(request): Json<AssignRequest>,
) -> Result<Json<AssignResponse>, ControlPlaneError> {
    let batch = state
        .registry
        .assign_batch(&request.instance_ids, request.port)
        .await?;

    if let Some((instance, port)) = batch.conflicts.into_iter().next() {
        return Err(HarborError::PortConflict { instance, port }.into());
    }

    Ok(Json(AssignResponse { ports: batch.ports }))
}

async fn release_server(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
) -> Result<StatusCode, ControlPlaneError> {
    state.registry.release(&instance_id).await?;
    Ok(StatusCode::OK)
}

/// Confirm success, then stop the listening socket. Graceful shutdown keeps the
/// in-flight connection alive long enough to deliver this response.
async fn close(State(state): State<AppState>) -> StatusCode {
    tracing::info!("close requested, shutting down port coordination server");
    state.cancel.cancel();
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    /// Spawn a coordinator on an ephemeral port and return its base URL plus
    /// the running handle (kept alive for the duration of the test).
    async fn spawn_coordinator() -> (String, RunningCoordinator) {
        let coordinator = PortCoordinator::with_port(0);
        let running = coordinator.start().await.unwrap();
        let base = format!("http://{}", running.addr);
        (base, running)
    }

    #[tokio::test]
    async fn test_get_unknown_instance_returns_404() {
        let (base, _running) = spawn_coordinator().await;
        let resp = reqwest::get(format!("{base}/servers/ghost")).await.unwrap();
        assert_eq!(resp.status(), 404);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("ghost"));
    }

    #[tokio::test]
    async fn test_assign_then_get_returns_same_port() {
        let (base, _running) = spawn_coordinator().await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/servers"))
            .json(&json!({ "instanceIds": ["app-1"] }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        let assigned = body["ports"][0].as_u64().unwrap();

        let resp = client
            .get(format!("{base}/servers/app-1"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["port"].as_u64().unwrap(), assigned);
    }

    #[tokio::test]
    async fn test_list_reflects_assignments() {
        let (base, _running) = spawn_coordinator().await;
        let client = reqwest::Client::new();

        let resp = client.get(format!("{base}/servers")).send().await.unwrap();
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["count"].as_u64().unwrap(), 0);

        client
            .post(format!("{base}/servers"))
            .json(&json!({ "instanceIds": ["a", "b"] }))
            .send()
            .await
            .unwrap();

        let resp = client.get(format!("{base}/servers")).send().await.unwrap();
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["count"].as_u64().unwrap(), 2);
        assert!(body["servers"]["a"].is_u64());
        assert!(body["servers"]["b"].is_u64());
    }

    #[tokio::test]
    async fn test_reassign_returns_409_and_keeps_original_port() {
        let (base, _running) = spawn_coordinator().await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/servers"))
            .json(&json!({ "instanceIds": ["app-1"] }))
            .send()
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        let original = body["ports"][0].as_u64().unwrap();

        let resp = client
            .post(format!("{base}/servers"))
            .json(&json!({ "instanceIds": ["app-1"] }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 409);
        let body: Value = resp.json().await.unwrap();
        let message = body["error"].as_str().unwrap();
        assert!(
            message.contains(&original.to_string()),
            "409 message should name the existing port: {message}"
        );

        let resp = client
            .get(format!("{base}/servers/app-1"))
            .send()
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["port"].as_u64().unwrap(), original);
    }

    #[tokio::test]
    async fn test_mixed_batch_409_but_fresh_instance_still_assigned() {
        let (base, _running) = spawn_coordinator().await;
        let client = reqwest::Client::new();

        client
            .post(format!("{base}/servers"))
            .json(&json!({ "instanceIds": ["b"] }))
            .send()
            .await
            .unwrap();

        let resp = client
            .post(format!("{base}/servers"))
            .json(&json!({ "instanceIds": ["a", "b"] }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 409);

        // "a" was fresh and must still hold an assignment after the 409.
        let resp = client
            .get(format!("{base}/servers/a"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    #[tokio::test]
    async fn test_out_of_range_port_returns_400_without_mutation() {
        let (base, _running) = spawn_coordinator().await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/servers"))
            .json(&json!({ "instanceIds": ["app-1"], "port": 70000 }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);

        let resp = client
            .get(format!("{base}/servers/app-1"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_delete_removes_assignment() {
        let (base, _running) = spawn_coordinator().await;
        let client = reqwest::Client::new();

        client
            .post(format!("{base}/servers"))
            .json(&json!({ "instanceIds": ["app-1"] }))
            .send()
            .await
            .unwrap();

        let resp = client
            .delete(format!("{base}/servers/app-1"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let resp = client
            .get(format!("{base}/servers/app-1"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_delete_unknown_instance_returns_404() {
        let (base, _running) = spawn_coordinator().await;
        let resp = reqwest::Client::new()
            .delete(format!("{base}/servers/ghost"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_batch_of_fresh_ids_returns_one_port_each() {
        let (base, _running) = spawn_coordinator().await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/servers"))
            .json(&json!({ "instanceIds": ["a", "b", "c", "d"] }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        let ports = body["ports"].as_array().unwrap();
        assert_eq!(ports.len(), 4);

        for id in ["a", "b", "c", "d"] {
            let resp = client
                .get(format!("{base}/servers/{id}"))
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), 200);
        }
    }

    #[tokio::test]
    async fn test_close_confirms_then_stops_listening() {
        let (base, running) = spawn_coordinator().await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/close"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        running.wait().await.unwrap();

        // Listener is gone — fresh connections must fail.
        let result = reqwest::Client::new()
            .get(format!("{base}/servers"))
            .send()
            .await;
        assert!(result.is_err(), "server should no longer accept connections");
    }

    #[tokio::test]
    async fn test_double_start_rejected() {
        let coordinator = PortCoordinator::with_port(0);
        let _running = coordinator.start().await.unwrap();
        let result = coordinator.start().await;
        assert!(matches!(result, Err(HarborError::AlreadyStarted)));
    }

    #[tokio::test]
    async fn test_occupied_coordination_port_is_distinct_error() {
        let first = PortCoordinator::with_port(0);
        let running = first.start().await.unwrap();
        let taken = running.addr.port();

        let second = PortCoordinator::with_port(taken);
        let result = second.start().await;
        assert!(
            matches!(result, Err(HarborError::CoordinatorRunning(port)) if port == taken),
            "bind failure on the coordination port should map to CoordinatorRunning"
        );
    }

    #[tokio::test]
    async fn test_shutdown_via_handle() {
        let (base, running) = spawn_coordinator().await;
        running.shutdown();
        running.wait().await.unwrap();

        let result = reqwest::Client::new()
            .get(format!("{base}/servers"))
            .send()
            .await;
        assert!(result.is_err());
    }
}
