//! Realtime HTTP Routes and WebSocket Handler
//!
//! `/realtime/ws` gives each browser session its own channel registry, so a
//! session holds at most one channel per table. Change events are pushed
//! through a bounded outbound queue; a session that cannot keep up loses
//! events.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::errors::ApiResult;
use super::response::ApiResponse;
use super::state::AppState;
use crate::auth::{AuthService, Profile};
use crate::observability::Event;
use crate::realtime::protocol::table_access;
use crate::realtime::{
    ChangeCallback, ChannelRegistry, ClientMessage, RealtimeError, ServerMessage, TableAccess,
};

/// Routes nested under `/realtime`
pub fn realtime_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(status_handler))
        .route("/ws", get(websocket_handler))
}

#[derive(Debug, Serialize)]
pub struct RealtimeStatus {
    pub connected: bool,
    pub probe_table: String,
    pub sessions: usize,
    /// Tables with a channel on the shared registry
    pub channels: Vec<String>,
}

async fn status_handler(State(state): State<AppState>) -> ApiResult<ApiResponse<RealtimeStatus>> {
    let realtime = &state.realtime;
    Ok(ApiResponse::ok(RealtimeStatus {
        connected: realtime.is_connected(),
        probe_table: realtime.probe().table().to_string(),
        sessions: state.sessions.load(Ordering::SeqCst),
        channels: realtime.registry().channels().await,
    }))
}

async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

async fn handle_websocket(socket: WebSocket, state: AppState) {
    let session_id = Uuid::new_v4().to_string();
    state.sessions.fetch_add(1, Ordering::SeqCst);
    tracing::info!(event = %Event::SessionOpened, session = %session_id, "websocket session opened");

    let (mut sink, mut stream) = socket.split();
    let (outbound, mut outbound_rx) = mpsc::channel::<ServerMessage>(state.outbound_capacity.max(1));

    let writer = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            if sink.send(Message::Text(msg.to_json())).await.is_err() {
                break;
            }
        }
    });

    let mut session = WsSession::new(
        state.realtime.session_registry(),
        state.auth.clone(),
        outbound.clone(),
    );

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let reply = match ClientMessage::parse(&text) {
                    Ok(msg) => session.handle(msg).await,
                    Err(e) => ServerMessage::error(&e),
                };
                if outbound.send(reply).await.is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) | Err(_) => break,
            _ => {}
        }
    }

    session.close().await;
    writer.abort();
    state.sessions.fetch_sub(1, Ordering::SeqCst);
    tracing::info!(event = %Event::SessionClosed, session = %session_id, "websocket session closed");
}

/// Protocol state of one WebSocket session
pub struct WsSession {
    registry: Arc<ChannelRegistry>,
    auth: AuthService,
    profile: Option<Profile>,
    outbound: mpsc::Sender<ServerMessage>,
}

impl WsSession {
    pub fn new(registry: Arc<ChannelRegistry>, auth: AuthService, outbound: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            registry,
            auth,
            profile: None,
            outbound,
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Apply one client message and produce the reply
    pub async fn handle(&mut self, msg: ClientMessage) -> ServerMessage {
        match msg {
            ClientMessage::Subscribe { table } => self.subscribe(table).await,
            ClientMessage::Unsubscribe { table } => {
                if let Some(handle) = self.registry.handle_for(&table).await {
                    self.registry.unsubscribe(&handle).await;
                }
                ServerMessage::Unsubscribed { table }
            }
            ClientMessage::Auth { token } => match self.auth.current_profile(&token).await {
                Ok(profile) => {
                    let reply = ServerMessage::Authenticated {
                        user_id: profile.id.clone(),
                        role: profile.role.to_string(),
                    };
                    self.profile = Some(profile);
                    reply
                }
                Err(e) => {
                    self.profile = None;
                    tracing::warn!(event = %Event::AuthFailed, error = %e, "websocket auth rejected");
                    ServerMessage::error(&RealtimeError::AuthError(e.to_string()))
                }
            },
            ClientMessage::Ping => ServerMessage::pong(),
        }
    }

    async fn subscribe(&mut self, table: String) -> ServerMessage {
        if let Err(e) = self.authorize(&table) {
            return ServerMessage::error(&e);
        }

        match self.registry.subscribe(&table, self.forwarder(&table)).await {
            Some(handle) => ServerMessage::Subscribed {
                table,
                channel: handle.key().to_string(),
            },
            None => ServerMessage::Unavailable { table },
        }
    }

    fn authorize(&self, table: &str) -> Result<(), RealtimeError> {
        match table_access(table)? {
            TableAccess::Public => Ok(()),
            TableAccess::Admin => match &self.profile {
                None => Err(RealtimeError::AuthenticationRequired),
                Some(profile) if profile.role.is_admin() => Ok(()),
                Some(_) => Err(RealtimeError::Unauthorized),
            },
        }
    }

    /// Callback pushing changes into the outbound queue without blocking
    fn forwarder(&self, table: &str) -> ChangeCallback {
        let outbound = self.outbound.clone();
        let table = table.to_string();
        Arc::new(move |event| {
            let msg = ServerMessage::Change {
                table: table.clone(),
                event,
            };
            if let Err(mpsc::error::TrySendError::Full(_)) = outbound.try_send(msg) {
                tracing::warn!(event = %Event::ChangeDropped, table = %table, "session queue full, change dropped");
            }
        })
    }

    /// Close every channel the session opened
    pub async fn close(&mut self) {
        self.registry.teardown().await;
    }

    pub async fn channels(&self) -> Vec<String> {
        self.registry.channels().await
    }
}
