//! JSON-RPC over WebSocket.
//!
//! One writer task per connection drains an outbound queue into the socket.
//! Every inbound text frame is handled on its own task, so a slow tool call
//! never holds back responses to later frames. Responses go out in
//! completion order.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::{AppState, JsonRpcHandler};

pub(crate) async fn ws_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let rpc = state.rpc.clone();
    let capacity = state.outbound_capacity.max(1);
    ws.on_upgrade(move |socket| handle_socket(rpc, socket, capacity))
}

async fn handle_socket(rpc: Arc<JsonRpcHandler>, socket: WebSocket, capacity: usize) {
    let connection_id = uuid::Uuid::new_v4();
    tracing::debug!(%connection_id, "ws_connection_opened");

    let (mut ws_sink, mut ws_stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(capacity);

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = ws_stream.next().await {
        let frame = match message {
            Ok(Message::Text(text)) => text.as_str().to_owned(),
            Ok(Message::Binary(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(%connection_id, "ws read error: {}", e);
                break;
            }
        };

        let rpc = rpc.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let response = rpc.handle_frame(&frame).await;
            // Writer is gone once the peer has disconnected.
            let _ = tx.send(response).await;
        });
    }

    // In-flight calls hold sender clones; the writer drains until they finish.
    drop(tx);
    let _ = writer.await;
    tracing::debug!(%connection_id, "ws_connection_closed");
}
