use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use maze_chase_server::constants::{START_LIVES, TICK_MS};
use maze_chase_server::engine::{GameEngine, GameEngineOptions};
use maze_chase_server::error::LevelResult;
use maze_chase_server::high_scores::HighScoreStore;
use maze_chase_server::maze::{builtin_levels, load_levels, LevelDescriptor};
use maze_chase_server::server_protocol::{
    parse_client_message, AbilityAction, ParsedClientMessage,
};
use maze_chase_server::server_utils::{parse_high_score_limit, sanitize_name, seconds_per_tick};
use maze_chase_server::types::{Character, RuntimeEvent};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type SharedState = Arc<ServerState>;

#[derive(Clone, Debug)]
enum OutboundMessage {
    Text(String),
    Close { code: u16, reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

struct ServerState {
    levels: Vec<LevelDescriptor>,
    high_scores: Mutex<HighScoreStore>,
    active_sessions: AtomicUsize,
}

#[derive(Debug, Deserialize)]
struct HighScoreQuery {
    limit: Option<String>,
}

struct Session {
    id: String,
    token: String,
    name: String,
    tx: mpsc::Sender<OutboundMessage>,
    game: Option<GameEngine>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let high_score_path = std::env::var("HIGH_SCORE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".data/high_scores.json"));

    let levels = match resolve_levels() {
        Ok(levels) => levels,
        Err(err) => {
            error!(%err, "failed to load levels");
            return Err(std::io::Error::other(err));
        }
    };
    info!(count = levels.len(), "levels loaded");

    let state = Arc::new(ServerState {
        levels,
        high_scores: Mutex::new(HighScoreStore::new(high_score_path)),
        active_sessions: AtomicUsize::new(0),
    });

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/highscores", get(high_scores_handler))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir() {
        let index_file = static_dir.join("index.html");
        info!(root = %static_dir.display(), "serving static files");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        warn!("static file root not found, serving api only");
        app
    };

    let bind_addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(%bind_addr, "listening");
    axum::serve(listener, app).await
}

fn resolve_levels() -> LevelResult<Vec<LevelDescriptor>> {
    match std::env::var("LEVELS_PATH") {
        Ok(raw) => load_levels(&PathBuf::from(raw)),
        Err(_) => builtin_levels(),
    }
}

fn resolve_static_dir() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var("STATIC_DIR") {
        let path = PathBuf::from(raw);
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }

    let candidates = [PathBuf::from("public"), PathBuf::from("dist")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "sessions": state.active_sessions.load(Ordering::Relaxed),
        "levels": state.levels.len(),
    }))
}

async fn high_scores_handler(
    State(state): State<SharedState>,
    Query(query): Query<HighScoreQuery>,
) -> impl IntoResponse {
    let guard = state.high_scores.lock().await;
    Json(guard.build_response(parse_high_score_limit(query.limit.as_deref())))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(256);
    let mut session = Session {
        id: make_id("session"),
        token: make_session_token(),
        name: sanitize_name(""),
        tx,
        game: None,
    };
    let active = state.active_sessions.fetch_add(1, Ordering::Relaxed) + 1;
    info!(session = %session.id, active, "session opened");

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, OutboundMessage::Close { .. });
            let result = match outbound {
                OutboundMessage::Text(payload) => {
                    ws_sender.send(Message::Text(payload.into())).await
                }
                OutboundMessage::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await
                }
            };
            if result.is_err() || should_close {
                break;
            }
        }
    });

    send(
        &session,
        &json!({
            "type": "welcome",
            "sessionId": session.id,
            "token": session.token,
            "levels": state.levels.iter().map(|level| level.name.as_str()).collect::<Vec<_>>(),
        }),
        QueuePolicy::DropOnFull,
    );

    let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if !tick_session(&state, &mut session).await {
                    break;
                }
            }
            received = ws_receiver.next() => {
                let Some(Ok(message)) = received else {
                    break;
                };
                match message {
                    Message::Text(raw) => {
                        handle_client_message(&state, &mut session, raw.as_str());
                    }
                    Message::Binary(raw) => match std::str::from_utf8(&raw) {
                        Ok(text) => handle_client_message(&state, &mut session, text),
                        Err(_) => send_error(&session, "invalid utf8 message"),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    }

    let active = state
        .active_sessions
        .fetch_sub(1, Ordering::Relaxed)
        .saturating_sub(1);
    info!(session = %session.id, active, "session closed");
    let _ = session.tx.try_send(OutboundMessage::Close {
        code: 1000,
        reason: "bye".to_string(),
    });
    drop(session);
    let _ = writer.await;
}

fn handle_client_message(state: &ServerState, session: &mut Session, raw: &str) {
    let Some(message) = parse_client_message(raw) else {
        send_error(session, "invalid message");
        return;
    };

    match message {
        ParsedClientMessage::Start {
            name,
            character,
            seed,
        } => {
            if let Some(name) = name {
                session.name = sanitize_name(&name);
            }
            let character = character.unwrap_or(Character::Classic);
            let options = GameEngineOptions {
                seed,
                character,
                starting_lives: START_LIVES,
                start_paused: false,
                levels: state.levels.clone(),
            };
            match GameEngine::new(options) {
                Ok(game) => {
                    info!(session = %session.id, name = %session.name, ?character, "game started");
                    send(
                        session,
                        &json!({
                            "type": "started",
                            "name": session.name,
                            "character": character,
                            "lives": game.lives_remaining(),
                        }),
                        QueuePolicy::DisconnectOnFull,
                    );
                    session.game = Some(game);
                }
                Err(err) => {
                    error!(session = %session.id, %err, "failed to start game");
                    send_error(session, "failed to start game");
                }
            }
        }
        ParsedClientMessage::Input { dir } => {
            if let Some(game) = session.game.as_mut() {
                game.set_input(dir);
            }
        }
        ParsedClientMessage::Pause => {
            let Some(game) = session.game.as_mut() else {
                return;
            };
            if !game.toggle_pause() {
                debug!(session = %session.id, "pause toggle refused");
            }
        }
        ParsedClientMessage::Ability { action } => {
            let Some(game) = session.game.as_mut() else {
                return;
            };
            let accepted = match action {
                AbilityAction::Activate => game.activate_ability(),
                AbilityAction::Fire => game.fire_ability(),
            };
            if !accepted {
                debug!(session = %session.id, ?action, "ability request refused");
            }
        }
        ParsedClientMessage::Ping { t } => {
            send(
                session,
                &json!({
                    "type": "pong",
                    "t": t,
                    "serverNow": now_ms(),
                }),
                QueuePolicy::DropOnFull,
            );
        }
    }
}

async fn tick_session(state: &ServerState, session: &mut Session) -> bool {
    let Some(game) = session.game.as_mut() else {
        return true;
    };
    game.advance(seconds_per_tick(TICK_MS));
    let snapshot = game.build_snapshot(true);

    let game_over = snapshot.events.iter().find_map(|event| match event {
        RuntimeEvent::GameOver { score, level } => Some((*score, *level)),
        _ => None,
    });
    let character = game.character();

    if !send(
        session,
        &json!({ "type": "state", "snapshot": snapshot }),
        QueuePolicy::DropOnFull,
    ) {
        return false;
    }

    if let Some((score, level)) = game_over {
        state
            .high_scores
            .lock()
            .await
            .record(&session.name, character, score, level);
        info!(session = %session.id, score, level, "high score recorded");
        return send(
            session,
            &json!({
                "type": "game_over",
                "name": session.name,
                "score": score,
                "level": level,
            }),
            QueuePolicy::DisconnectOnFull,
        );
    }
    true
}

fn send(session: &Session, message: &Value, policy: QueuePolicy) -> bool {
    match session.tx.try_send(OutboundMessage::Text(message.to_string())) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            if policy == QueuePolicy::DisconnectOnFull {
                warn!(session = %session.id, "outbound queue full, disconnecting");
                return false;
            }
            debug!(session = %session.id, "outbound queue full, dropping message");
            true
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

fn send_error(session: &Session, message: &str) {
    send(
        session,
        &json!({ "type": "error", "message": message }),
        QueuePolicy::DropOnFull,
    );
}

fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}

fn make_session_token() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
