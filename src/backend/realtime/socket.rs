/**
 * WebSocket Connection Handler
 *
 * This module implements the `/ws` endpoint. Each accepted socket gets one
 * task that:
 *
 * 1. Registers the connection with the coordinator (which queues the
 *    initial `initialize-locks` snapshot)
 * 2. Spawns a writer that drains the connection's outbound queue into the
 *    socket as JSON text frames
 * 3. Reads frames, parses them as `ClientMessage` and dispatches them
 * 4. Runs the disconnect reaper once the socket closes for any reason
 *
 * # Frames
 *
 * - Text frames carry one JSON `ClientMessage`
 * - Binary frames are rejected with a private `error`
 * - Ping/pong is answered by axum
 */

use crate::backend::coordinator::LockCoordinator;
use crate::shared::lock::ConnectionId;
use crate::shared::protocol::{ClientMessage, ServerMessage};
use crate::shared::SharedError;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};

/// What the read loop should do after a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Continue,
    Close,
}

/// Handle WebSocket upgrade (GET /ws)
pub async fn handle_socket_upgrade(
    State(coordinator): State<LockCoordinator>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| serve_connection(socket, coordinator))
}

/// Drive one client connection until it closes
pub async fn serve_connection(socket: WebSocket, coordinator: LockCoordinator) {
    let (conn, mut outbound) = coordinator.connect().await;
    let (mut sink, mut stream) = socket.split();

    let mut writer = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let text = match message.to_json() {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("[Socket] Failed to serialize message: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    loop {
        tokio::select! {
            frame = stream.next() => {
                let outcome = match frame {
                    Some(Ok(frame)) => handle_frame(&coordinator, conn, frame).await,
                    Some(Err(e)) => {
                        tracing::debug!("[Socket] Connection {} errored: {}", conn, e);
                        FrameOutcome::Close
                    }
                    None => FrameOutcome::Close,
                };
                if outcome == FrameOutcome::Close {
                    break;
                }
            }
            _ = &mut writer => {
                tracing::debug!("[Socket] Writer for {} stopped", conn);
                break;
            }
        }
    }

    coordinator.disconnect(conn).await;
    writer.abort();
}

/// Handle one inbound frame
pub async fn handle_frame(
    coordinator: &LockCoordinator,
    conn: ConnectionId,
    frame: Message,
) -> FrameOutcome {
    match frame {
        Message::Text(text) => {
            match ClientMessage::parse(text.as_str()) {
                Ok(message) => {
                    // Failures were already reported to the client
                    let _ = coordinator.dispatch(conn, message).await;
                }
                Err(e) => reject(coordinator, conn, e).await,
            }
            FrameOutcome::Continue
        }
        Message::Binary(_) => {
            reject(coordinator, conn, SharedError::protocol("binary frames are not supported")).await;
            FrameOutcome::Continue
        }
        Message::Close(_) => FrameOutcome::Close,
        Message::Ping(_) | Message::Pong(_) => FrameOutcome::Continue,
    }
}

async fn reject(coordinator: &LockCoordinator, conn: ConnectionId, error: SharedError) {
    tracing::debug!("[Socket] Rejected frame from {}: {}", conn, error);
    coordinator
        .registry()
        .send_to(conn, ServerMessage::error(None, error.to_string()))
        .await;
}
