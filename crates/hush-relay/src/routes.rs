use axum::{
    Json,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
};
use tracing::debug;

use hush_types::Message;

use crate::connection;
use crate::dispatcher::Dispatcher;

/// GET /api/v1/chats
pub async fn get_history(State(dispatcher): State<Dispatcher>) -> Json<Vec<Message>> {
    let history = dispatcher.history().await;
    debug!("Serving {} message(s) of history", history.len());
    Json(history)
}

/// GET /gateway
pub async fn ws_upgrade(
    State(dispatcher): State<Dispatcher>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher))
}
