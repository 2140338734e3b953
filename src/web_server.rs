use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    serve, Json, Router,
};
use futures::{sink::SinkExt, stream::StreamExt};
use minijinja::{path_loader, Environment};
use minijinja_autoreload::AutoReloader;
use serde::{Deserialize, Serialize};
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::{broadcast, Mutex};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{debug, error, info, warn};

use crate::actions::Actions;
use crate::controller::{ChatController, ControllerError, Notifier, Snapshot, StyleOutcome};
use crate::fonts::FontLinks;
use crate::state::{FormState, Message, Notice, Theme};

/// Frame pushed to every WebSocket client.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastMessage {
    pub message_type: String,
    pub payload: serde_json::Value,
}

impl BroadcastMessage {
    fn new<T: Serialize>(message_type: &str, payload: &T) -> Self {
        Self {
            message_type: message_type.to_string(),
            payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Turns controller notices into `Notice` frames.
struct BroadcastNotifier {
    tx: broadcast::Sender<BroadcastMessage>,
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, notice: Notice) {
        if self.tx.send(BroadcastMessage::new("Notice", &notice)).is_err() {
            debug!(title = %notice.title, "No WebSocket clients for notice");
        }
    }
}

// Shared application state
#[derive(Clone)]
pub struct AppState {
    templates: Arc<AutoReloader>,
    // Channel for broadcasting notices and state changes to all connected WebSocket clients
    broadcast_tx: broadcast::Sender<BroadcastMessage>,
    controller: Arc<Mutex<ChatController>>,
    actions: Actions,
    fonts: FontLinks,
}

impl AppState {
    pub fn new(actions: Actions, templates_dir: impl Into<PathBuf>) -> Self {
        let (broadcast_tx, _) = broadcast::channel::<BroadcastMessage>(100);
        let fonts = FontLinks::new();
        let controller = ChatController::new(
            Arc::new(fonts.clone()),
            Arc::new(BroadcastNotifier {
                tx: broadcast_tx.clone(),
            }),
        );
        Self {
            templates: Arc::new(create_minijinja_env(templates_dir.into())),
            broadcast_tx,
            controller: Arc::new(Mutex::new(controller)),
            actions,
            fonts,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastMessage> {
        self.broadcast_tx.subscribe()
    }

    async fn view(&self) -> StateView {
        let snapshot = self.controller.lock().await.snapshot();
        StateView {
            snapshot,
            font_stylesheets: self.fonts.stylesheets(),
        }
    }

    async fn publish_state(&self) {
        let view = self.view().await;
        let _ = self
            .broadcast_tx
            .send(BroadcastMessage::new("State", &view));
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StateView {
    #[serde(flatten)]
    snapshot: Snapshot,
    font_stylesheets: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    reply: Message,
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct StyleRequest {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StyleResponse {
    applied: bool,
    theme: Theme,
    font_stylesheets: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PanelRequest {
    open: bool,
}

#[derive(Debug)]
enum ApiError {
    Invalid(String),
    Busy(String),
    Internal(String),
}

impl From<ControllerError> for ApiError {
    fn from(err: ControllerError) -> Self {
        match err {
            ControllerError::Invalid(_) => ApiError::Invalid(err.to_string()),
            ControllerError::Busy(_) => ApiError::Busy(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Invalid(m) => (StatusCode::UNPROCESSABLE_ENTITY, m),
            ApiError::Busy(m) => (StatusCode::CONFLICT, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

// Minijinja Environment setup
fn create_minijinja_env(templates_dir: PathBuf) -> AutoReloader {
    AutoReloader::new(move |notifier| {
        let mut env = Environment::new();
        env.set_loader(path_loader(templates_dir.clone()));
        // Watch the templates directory for changes
        notifier.watch_path(&templates_dir, true);
        Ok(env)
    })
}

fn css_declarations(theme: &Theme) -> String {
    theme
        .css_variables()
        .into_iter()
        .map(|(name, value)| format!("{}: {};", name, value))
        .collect::<Vec<_>>()
        .join(" ")
}

async fn index_handler(
    State(state): State<AppState>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let StateView {
        snapshot,
        font_stylesheets,
    } = state.view().await;
    let theme_css = css_declarations(&snapshot.theme);
    let context = minijinja::context! {
        title => "Makama AI",
        messages => snapshot.messages,
        theme => snapshot.theme,
        theme_css => theme_css,
        font_stylesheets => font_stylesheets,
        chat_submitting => snapshot.chat == FormState::Submitting,
        style_submitting => snapshot.style == FormState::Submitting,
        style_panel_open => snapshot.style_panel_open,
    };
    // Acquire env, get template, and render within the same block
    state
        .templates
        .acquire_env()
        .and_then(|env| env.get_template("index.html").and_then(|tmpl| tmpl.render(context)))
        .map(Html)
        .map_err(|e| {
            error!("Failed to get or render template: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("Internal Server Error: {}", e)),
            )
        })
}

async fn state_handler(State(state): State<AppState>) -> Json<StateView> {
    Json(state.view().await)
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let pending = state.controller.lock().await.begin_chat(&request.message)?;
    state.publish_state().await;

    // Detached: the chat form must return to Idle even if the client disconnects.
    let task_state = state.clone();
    let handle = tokio::spawn(async move {
        let reply = task_state.actions.get_ai_response(pending.query()).await;
        let result = {
            let mut controller = task_state.controller.lock().await;
            let reply = controller.complete_chat(pending, reply).clone();
            (reply, controller.messages().to_vec())
        };
        task_state.publish_state().await;
        result
    });

    let (reply, messages) = handle
        .await
        .map_err(|e| ApiError::Internal(format!("chat task failed: {}", e)))?;
    Ok(Json(ChatResponse { reply, messages }))
}

async fn style_handler(
    State(state): State<AppState>,
    Json(request): Json<StyleRequest>,
) -> Result<Json<StyleResponse>, ApiError> {
    let pending = state.controller.lock().await.begin_style(&request.prompt)?;
    state.publish_state().await;

    let task_state = state.clone();
    let handle = tokio::spawn(async move {
        let theme = task_state.actions.get_ai_style(pending.prompt()).await;
        let (outcome, current) = {
            let mut controller = task_state.controller.lock().await;
            let outcome = controller.complete_style(pending, theme);
            (outcome, controller.theme().clone())
        };
        task_state.publish_state().await;
        (outcome, current)
    });

    let (outcome, theme) = handle
        .await
        .map_err(|e| ApiError::Internal(format!("style task failed: {}", e)))?;
    Ok(Json(StyleResponse {
        applied: matches!(outcome, StyleOutcome::Applied(_)),
        theme,
        font_stylesheets: state.fonts.stylesheets(),
    }))
}

async fn panel_handler(
    State(state): State<AppState>,
    Json(request): Json<PanelRequest>,
) -> Json<StateView> {
    {
        let mut controller = state.controller.lock().await;
        if request.open {
            controller.open_style_panel();
        } else {
            controller.close_style_panel();
        }
    }
    Json(state.view().await)
}

async fn reset_handler(State(state): State<AppState>) -> Result<Json<StateView>, ApiError> {
    state.controller.lock().await.reset()?;
    state.publish_state().await;
    Ok(Json(state.view().await))
}

// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    info!("WebSocket connection upgrade requested");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

// Handle individual WebSocket connections
async fn handle_socket(socket: WebSocket, state: AppState) {
    info!("New WebSocket connection established");
    let mut broadcast_rx = state.subscribe();
    let (mut sender, mut receiver) = socket.split();

    // Start the client off with the current state
    let initial = BroadcastMessage::new("State", &state.view().await);
    if let Ok(json_msg) = serde_json::to_string(&initial) {
        if sender.send(WsMessage::Text(json_msg)).await.is_err() {
            warn!("Failed to send initial state to new WebSocket client");
            return;
        }
    }

    loop {
        tokio::select! {
            msg = broadcast_rx.recv() => {
                match msg {
                    Ok(msg) => match serde_json::to_string(&msg) {
                        Ok(json_msg) => {
                            if sender.send(WsMessage::Text(json_msg)).await.is_err() {
                                warn!("WebSocket client disconnected or send error. Closing connection.");
                                break;
                            }
                        }
                        Err(e) => error!("Failed to serialize broadcast message: {}", e),
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "WebSocket client lagging behind broadcasts");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(WsMessage::Close(_))) | None => {
                        info!("WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(WsMessage::Text(text))) => {
                        // The page only listens; submissions go through the JSON API.
                        debug!("Ignoring text message from client: {}", text);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket receive error: {}", e);
                        break;
                    }
                }
            }
        }
    }
    info!("WebSocket connection closed");
}

pub fn router(state: AppState, static_dir: &Path) -> Router {
    // Serve static files from the static directory
    let static_files_service =
        ServeDir::new(static_dir).not_found_service(tower::service_fn(|_: axum::extract::Request| async {
            Ok::<_, std::convert::Infallible>((StatusCode::NOT_FOUND, "Not Found").into_response())
        }));

    Router::new()
        .route("/", get(index_handler))
        .route("/api/state", get(state_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/style", post(style_handler))
        .route("/api/style/panel", post(panel_handler))
        .route("/api/reset", post(reset_handler))
        .route("/ws", get(ws_handler))
        .nest_service("/static", static_files_service)
        .with_state(state)
        .layer(TraceLayer::new_for_http()) // Add request logging
}

pub async fn start_web_server(port: u16, state: AppState, static_dir: &Path) -> Result<()> {
    let app = router(state, static_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Web server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    serve(listener, app.into_make_service())
        .await
        .context("Web server failed")?;

    Ok(())
}
