//! WebSocket 연결 handler.

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
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use super::messages::{ClientMessage, ServerMessage};
use crate::metrics::{decrement_websocket_connections, increment_websocket_connections};
use crate::state::AppState;

/// 세션별 직접 응답 큐 크기.
const REPLY_QUEUE_SIZE: usize = 32;

/// WebSocket 업그레이드 핸들러.
///
/// `GET /ws`
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// WebSocket 연결 처리.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = uuid::Uuid::new_v4().to_string();
    info!(session_id = %session_id, "WebSocket connected");
    increment_websocket_connections();

    let mut events = state.subscribe_events();
    let mut positions = state.positions.subscribe();
    let (mut sender, mut receiver) = socket.split();
    let (reply_tx, mut reply_rx) = mpsc::channel::<ServerMessage>(REPLY_QUEUE_SIZE);

    let welcome = ServerMessage::Welcome {
        version: state.version.clone(),
        timestamp: Utc::now().timestamp_millis(),
    };
    if let Ok(json) = welcome.to_json() {
        let _ = sender.send(Message::Text(json.into())).await;
    }

    // 클라이언트 메시지 수신 태스크
    let session = session_id.clone();
    let mut receive_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(msg) => {
                    if !handle_client_message(&session, msg, &reply_tx).await {
                        break;
                    }
                }
                Err(e) => {
                    warn!(session_id = %session, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    // 이벤트 전송 태스크
    let session = session_id.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                Some(reply) = reply_rx.recv() => reply,
                event = events.recv() => match event {
                    Ok(msg) => msg,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(session_id = %session, skipped = n, "WebSocket lagged behind server events");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                event = positions.recv() => match event {
                    Ok(event) => ServerMessage::Position(event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(session_id = %session, skipped = n, "WebSocket lagged behind position events");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };

            match msg.to_json() {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "Failed to serialize WebSocket message"),
            }
        }
    });

    // 하나의 태스크가 종료되면 다른 것도 종료
    tokio::select! {
        _ = &mut receive_task => {
            debug!(session_id = %session_id, "Receive task ended");
            send_task.abort();
        }
        _ = &mut send_task => {
            debug!(session_id = %session_id, "Send task ended");
            receive_task.abort();
        }
    }

    decrement_websocket_connections();
    info!(session_id = %session_id, "WebSocket disconnected");
}

/// 클라이언트 메시지 처리.
///
/// `true`면 연결 유지, `false`면 연결 종료.
async fn handle_client_message(
    session_id: &str,
    msg: Message,
    reply: &mpsc::Sender<ServerMessage>,
) -> bool {
    match msg {
        Message::Text(text) => {
            let response = match ClientMessage::from_json(text.as_str()) {
                Ok(ClientMessage::Ping) => ServerMessage::Pong {
                    timestamp: Utc::now().timestamp_millis(),
                },
                Err(e) => {
                    warn!(session_id, error = %e, "Invalid WebSocket message");
                    ServerMessage::error("INVALID_MESSAGE", e.to_string())
                }
            };
            reply.send(response).await.is_ok()
        }
        Message::Binary(_) => {
            warn!(session_id, "Binary messages not supported");
            true
        }
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            debug!(session_id, "Close message received");
            false
        }
    }
}

/// WebSocket 라우터 생성.
pub fn websocket_router() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(websocket_handler))
}
