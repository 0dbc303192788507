use std::path::PathBuf;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect};
use futures_util::{SinkExt, StreamExt};
use syncboard_shared::{wire, BoardId, ClientMessage, ServerMessage};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::logic::{apply_client_message, disconnect, reject_unknown, Connection};
use crate::state::AppState;

pub async fn ping_handler() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

pub async fn root_handler() -> impl IntoResponse {
    let board_id = Uuid::new_v4();
    Redirect::to(&format!("/b/{board_id}"))
}

pub async fn board_handler(
    Path(board_id): Path<String>,
    axum::Extension(index_file): axum::Extension<PathBuf>,
) -> impl IntoResponse {
    if BoardId::parse(&board_id).is_none() {
        return StatusCode::NOT_FOUND.into_response();
    }
    match tokio::fs::read_to_string(index_file).await {
        Ok(contents) => Html(contents).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

fn decode_frame(message: &Message) -> Option<Result<ClientMessage, wire::WireError>> {
    match message {
        Message::Text(text) => Some(wire::decode_json(text)),
        Message::Binary(data) => Some(wire::decode_binary(data)),
        _ => None,
    }
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut socket_sender, mut socket_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let socket_id = Uuid::new_v4();
    info!(socket = %socket_id, "ws connected");

    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let payload = match wire::encode_binary(&message) {
                Ok(payload) => payload,
                Err(error) => {
                    warn!(socket = %socket_id, kind = message.kind(), %error, "encode failed");
                    continue;
                }
            };
            if socket_sender.send(Message::Binary(payload)).await.is_err() {
                break;
            }
        }
    });

    let mut connection = Connection::new(tx);
    let mut close_frame = None;

    while let Some(Ok(message)) = socket_receiver.next().await {
        if let Message::Close(frame) = message {
            close_frame = frame;
            break;
        }
        match decode_frame(&message) {
            Some(Ok(client_message)) => {
                apply_client_message(&state.registry, &mut connection, client_message).await;
            }
            Some(Err(error)) => {
                warn!(socket = %socket_id, %error, "undecodable frame");
                reject_unknown(&connection);
            }
            None => {}
        }
    }

    disconnect(&state.registry, &mut connection).await;
    send_task.abort();
    match close_frame {
        Some(frame) => info!(
            socket = %socket_id,
            code = frame.code,
            reason = %frame.reason,
            "ws disconnected"
        ),
        None => info!(socket = %socket_id, "ws disconnected"),
    }
}
