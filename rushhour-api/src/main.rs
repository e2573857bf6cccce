//! Rush Hour state-space API
//!
//! Hosts one tracking session. A board feed connects to `/ws`, receives
//! `{"event":"connected"}`, then pushes one `{"cars": {...}}` message per
//! physical board change. Viewers read the explored graph from the JSON
//! endpoints or subscribe to `/watch` for a snapshot after every event.

use std::net::SocketAddr;
use std::path::{Path as FilePath, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use rushhour_core::{
    dot, parse_configuration, starting_configuration, Configuration, ConfigurationError,
    Fingerprint, Grid, InboundMessage, Observed, OutboundMessage, Presenter, RevisitPolicy,
    SessionView, SlideRules, Snapshot, Tracker, TrackerOptions, Transition, DEFAULT_BOARD_SIZE,
};

// =============================================================================
// Configuration
// =============================================================================

#[derive(Parser, Debug)]
#[command(name = "rushhour-api", about = "Track the explored state space of a Rush Hour board")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "RUSHHOUR_BIND", default_value = "0.0.0.0:8000")]
    bind: SocketAddr,

    /// Side length of the square board
    #[arg(long, env = "RUSHHOUR_BOARD_SIZE", default_value_t = DEFAULT_BOARD_SIZE)]
    board_size: u16,

    /// JSON file with the starting configuration (defaults to the red/blue board)
    #[arg(long, env = "RUSHHOUR_INITIAL")]
    initial: Option<PathBuf>,

    /// Also record edges for moves back into already-visited states
    #[arg(long, env = "RUSHHOUR_REVISIT_EDGES")]
    revisit_edges: bool,
}

#[derive(Debug, Error)]
enum StartupError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("initial configuration does not fit the board: {0}")]
    Invalid(#[from] ConfigurationError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(std::io::Error),
}

/// Load the starting configuration and check it fits the board.
fn load_initial(path: Option<&FilePath>, board_size: u16) -> Result<Configuration, StartupError> {
    let initial = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|source| StartupError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            parse_configuration(&text).map_err(|source| StartupError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        }
        None => starting_configuration(),
    };
    initial.validate(board_size)?;
    Ok(initial)
}

// =============================================================================
// Session State
// =============================================================================

/// Shared application state
struct AppStateInner {
    /// The only writer of session state; arrivals are serialized by the lock.
    tracker: Mutex<Tracker<SlideRules>>,
    /// Latest render, replaced after every observation.
    renders: watch::Sender<Snapshot>,
}

type AppState = Arc<AppStateInner>;

fn app_state(tracker: Tracker<SlideRules>) -> AppState {
    let (renders, _) = watch::channel(tracker.view().snapshot());
    Arc::new(AppStateInner {
        tracker: Mutex::new(tracker),
        renders,
    })
}

/// Publishes each render pass to subscribers.
struct Publisher<'a>(&'a watch::Sender<Snapshot>);

impl Presenter for Publisher<'_> {
    fn render(&mut self, view: &SessionView<'_>) {
        self.0.send_replace(view.snapshot());
    }
}

/// Run one observation through the tracker and publish the result. The
/// returned snapshot is taken under the same lock as the observation.
async fn apply(state: &AppStateInner, cars: Configuration) -> (Observed, Snapshot) {
    let mut tracker = state.tracker.lock().await;
    let observed = tracker.handle(cars, &mut Publisher(&state.renders));
    (observed, tracker.view().snapshot())
}

/// Handle one text frame from the board feed. Frames that are not inbound
/// messages never reach the tracker.
async fn apply_feed_text(state: &AppStateInner, text: &str) -> Option<Observed> {
    match InboundMessage::parse(text) {
        Ok(message) => Some(apply(state, message.cars).await.0),
        Err(e) => {
            warn!(error = %e, "dropping unparseable feed message");
            None
        }
    }
}

// =============================================================================
// JSON Models
// =============================================================================

#[derive(Serialize)]
struct GraphModel {
    current: Fingerprint,
    nodes: Vec<Fingerprint>,
    edges: Vec<Transition>,
}

#[derive(Serialize)]
struct ObserveModel {
    #[serde(flatten)]
    observed: Observed,
    state: Snapshot,
}

#[derive(Serialize)]
struct HealthModel {
    status: String,
}

#[derive(Serialize)]
struct ErrorModel {
    detail: String,
}

#[derive(Debug, Error)]
enum ApiError {
    #[error("malformed message: {0}")]
    BadMessage(#[from] serde_json::Error),
    #[error("message body is not UTF-8")]
    NotUtf8,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorModel {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}

// =============================================================================
// Board Feed
// =============================================================================

async fn feed(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| run_feed(socket, state))
}

async fn run_feed(mut socket: WebSocket, state: AppState) {
    info!("board feed connected");

    let hello = match OutboundMessage::Connected.to_json() {
        Ok(hello) => hello,
        Err(e) => {
            error!(error = %e, "failed to encode connected message");
            return;
        }
    };
    if let Err(e) = socket.send(Message::Text(hello.into())).await {
        warn!(error = %e, "board feed closed before handshake");
        return;
    }

    while let Some(frame) = socket.recv().await {
        match frame {
            Ok(Message::Text(text)) => {
                apply_feed_text(&state, text.as_str()).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "board feed error");
                break;
            }
        }
    }

    info!("board feed disconnected");
}

async fn watch_renders(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let renders = state.renders.subscribe();
    ws.on_upgrade(move |socket| run_watch(socket, renders))
}

async fn run_watch(mut socket: WebSocket, mut renders: watch::Receiver<Snapshot>) {
    loop {
        let json = serde_json::to_string(&*renders.borrow_and_update());
        let json = match json {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "failed to encode snapshot");
                break;
            }
        };
        if socket.send(Message::Text(json.into())).await.is_err() {
            break;
        }
        if renders.changed().await.is_err() {
            break;
        }
    }
}

// =============================================================================
// API Endpoints
// =============================================================================

async fn get_state(State(state): State<AppState>) -> Json<Snapshot> {
    Json(state.renders.borrow().clone())
}

async fn get_grid(State(state): State<AppState>) -> Json<Grid> {
    Json(state.renders.borrow().grid.clone())
}

async fn get_graph(State(state): State<AppState>) -> Json<GraphModel> {
    let snapshot = state.renders.borrow();
    Json(GraphModel {
        current: snapshot.fingerprint,
        nodes: snapshot.visited.clone(),
        edges: snapshot.transitions.clone(),
    })
}

async fn get_graph_dot(State(state): State<AppState>) -> impl IntoResponse {
    let body = dot::snapshot_dot(&state.renders.borrow());
    ([(header::CONTENT_TYPE, "text/vnd.graphviz")], body)
}

async fn observe(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ObserveModel>, ApiError> {
    let text = std::str::from_utf8(&body).map_err(|_| ApiError::NotUtf8)?;
    let message = InboundMessage::parse(text)?;
    let (observed, snapshot) = apply(&state, message.cars).await;
    Ok(Json(ObserveModel {
        observed,
        state: snapshot,
    }))
}

async fn reset_session(State(state): State<AppState>) -> Json<Snapshot> {
    let mut tracker = state.tracker.lock().await;
    tracker.reset();
    let snapshot = tracker.view().snapshot();
    state.renders.send_replace(snapshot.clone());
    Json(snapshot)
}

async fn health() -> Json<HealthModel> {
    Json(HealthModel {
        status: "ok".to_string(),
    })
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(feed))
        .route("/watch", get(watch_renders))
        .route("/state", get(get_state))
        .route("/grid", get(get_grid))
        .route("/graph", get(get_graph))
        .route("/graph.dot", get(get_graph_dot))
        .route("/observe", post(observe))
        .route("/reset", post(reset_session))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Main
// =============================================================================

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("interrupt received, shutting down");
}

async fn run(args: Args) -> Result<(), StartupError> {
    let initial = load_initial(args.initial.as_deref(), args.board_size)?;
    let options = TrackerOptions {
        board_size: args.board_size,
        revisit: if args.revisit_edges {
            RevisitPolicy::Record
        } else {
            RevisitPolicy::Skip
        },
    };
    let tracker = Tracker::with_options(initial, SlideRules::new(args.board_size), options);
    let fingerprint = tracker.state().fingerprint();
    let state = app_state(tracker);

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .map_err(|source| StartupError::Bind {
            addr: args.bind,
            source,
        })?;
    info!(
        addr = %args.bind,
        board_size = args.board_size,
        revisit = ?options.revisit,
        fingerprint,
        "rush hour tracker listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rushhour_core::ILLEGAL_MOVE_NOTICE;

    fn test_state() -> AppState {
        app_state(Tracker::new(starting_configuration(), SlideRules::new(6)))
    }

    const RED_RIGHT: &str = r#"{"cars": {"red": [[0, 1], [0, 2]], "blue": [[5, 4], [5, 5]]}}"#;
    const BLUE_ON_RED: &str = r#"{"cars": {"red": [[0, 0], [0, 1]], "blue": [[0, 1], [0, 2]]}}"#;

    #[tokio::test]
    async fn test_feed_text_publishes_render() {
        let state = test_state();
        let mut renders = state.renders.subscribe();

        let outcome = apply_feed_text(&state, RED_RIGHT).await;

        assert_eq!(outcome, Some(Observed::Discovered { transition: None }));
        assert!(renders.has_changed().unwrap());
        let snapshot = renders.borrow_and_update().clone();
        assert_eq!(snapshot.visited.len(), 2);
        assert_eq!(snapshot.message, None);
    }

    #[tokio::test]
    async fn test_rejection_is_published() {
        let state = test_state();
        let outcome = apply_feed_text(&state, BLUE_ON_RED).await;
        assert_eq!(outcome, Some(Observed::Rejected));
        let snapshot = state.renders.borrow().clone();
        assert_eq!(snapshot.message.as_deref(), Some(ILLEGAL_MOVE_NOTICE));
        assert_eq!(snapshot.fingerprint, starting_configuration().fingerprint());
    }

    #[tokio::test]
    async fn test_negative_cell_is_rejected_and_rendered() {
        let state = test_state();
        let mut renders = state.renders.subscribe();
        renders.borrow_and_update();

        let outcome = apply_feed_text(
            &state,
            r#"{"cars": {"red": [[0, -1], [0, 0]], "blue": [[5, 4], [5, 5]]}}"#,
        )
        .await;

        assert_eq!(outcome, Some(Observed::Rejected));
        assert!(renders.has_changed().unwrap());
        let snapshot = renders.borrow_and_update().clone();
        assert_eq!(snapshot.message.as_deref(), Some(ILLEGAL_MOVE_NOTICE));
        assert_eq!(snapshot.fingerprint, starting_configuration().fingerprint());
    }

    #[tokio::test]
    async fn test_apply_snapshot_matches_outcome() {
        let state = test_state();
        let cars = InboundMessage::parse(RED_RIGHT).unwrap().cars;

        let (observed, snapshot) = apply(&state, cars.clone()).await;

        assert_eq!(observed, Observed::Discovered { transition: None });
        assert_eq!(snapshot.fingerprint, cars.fingerprint());
        assert_eq!(snapshot, state.renders.borrow().clone());
    }

    #[tokio::test]
    async fn test_garbage_never_reaches_tracker() {
        let state = test_state();
        let mut renders = state.renders.subscribe();
        renders.borrow_and_update();

        assert_eq!(apply_feed_text(&state, "{not json").await, None);
        assert_eq!(apply_feed_text(&state, r#"{"event": "connected"}"#).await, None);

        assert!(!renders.has_changed().unwrap());
        assert_eq!(state.tracker.lock().await.state().visited().len(), 1);
    }

    #[tokio::test]
    async fn test_observe_endpoint() {
        let state = test_state();
        let Json(model) = observe(State(state.clone()), Bytes::from(RED_RIGHT))
            .await
            .unwrap();
        assert_eq!(model.observed, Observed::Discovered { transition: None });
        assert_eq!(model.state.visited.len(), 2);

        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["outcome"], "discovered");
        assert_eq!(json["state"]["message"], serde_json::Value::Null);

        let err = observe(State(state), Bytes::from_static(b"[]")).await;
        assert!(matches!(err, Err(ApiError::BadMessage(_))));
    }

    #[tokio::test]
    async fn test_graph_endpoints_follow_events() {
        let state = test_state();
        apply_feed_text(&state, RED_RIGHT).await;
        apply_feed_text(
            &state,
            r#"{"cars": {"red": [[0, 2], [0, 3]], "blue": [[5, 4], [5, 5]]}}"#,
        )
        .await;

        let Json(graph) = get_graph(State(state.clone())).await;
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].target, graph.current);

        let Json(grid) = get_grid(State(state.clone())).await;
        assert_eq!(grid.size(), 6);

        let dot = dot::snapshot_dot(&state.renders.borrow());
        assert!(dot.contains("->"));
    }

    #[tokio::test]
    async fn test_reset_endpoint() {
        let state = test_state();
        apply_feed_text(&state, RED_RIGHT).await;

        let Json(snapshot) = reset_session(State(state.clone())).await;

        assert_eq!(snapshot.visited.len(), 1);
        assert_eq!(snapshot.fingerprint, starting_configuration().fingerprint());
        assert_eq!(state.renders.borrow().visited.len(), 1);
    }

    #[test]
    fn test_load_initial_default() {
        let initial = load_initial(None, 6).unwrap();
        assert_eq!(initial.fingerprint(), starting_configuration().fingerprint());
        assert!(matches!(load_initial(None, 4), Err(StartupError::Invalid(_))));
    }

    #[test]
    fn test_load_initial_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("start.json");
        std::fs::write(&path, r#"{"1": [[2, 0], [2, 1]], "2": [[0, 3], [1, 3]]}"#).unwrap();
        let initial = load_initial(Some(&path), 6).unwrap();
        assert_eq!(initial.len(), 2);

        std::fs::write(&path, "[").unwrap();
        assert!(matches!(
            load_initial(Some(&path), 6),
            Err(StartupError::Parse { .. })
        ));

        let missing = dir.path().join("missing.json");
        assert!(matches!(
            load_initial(Some(&missing), 6),
            Err(StartupError::Read { .. })
        ));
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["rushhour-api"]).unwrap();
        assert_eq!(args.board_size, DEFAULT_BOARD_SIZE);
        assert!(!args.revisit_edges);
        assert!(args.initial.is_none());
    }
}
