use std::sync::Arc;

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, warn};

use crate::application::notification_hub::NotificationHub;
use crate::presentation::AppState;

/// GET /api/events
///
/// Upgrades to a WebSocket and streams post-mutation events as JSON text
/// frames until the client disconnects. No history is replayed.
pub(crate) async fn feed_events(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub.clone()))
}

async fn handle_socket(socket: WebSocket, hub: Arc<NotificationHub>) {
    let subscription = hub.subscribe();
    let subscriber_id = subscription.id;
    let mut events = subscription.events;
    debug!(
        subscriber = subscriber_id,
        total = hub.subscriber_count(),
        "feed subscriber connected"
    );

    let (mut sender, mut receiver) = socket.split();

    let mut forward = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(error = %err, "failed to serialize feed event");
                    continue;
                }
            };
            if sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    // drain client frames until it goes away; the socket carries no inbound
    // protocol beyond close
    loop {
        tokio::select! {
            frame = receiver.next() => match frame {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            _ = &mut forward => break,
        }
    }

    forward.abort();
    hub.unsubscribe(subscriber_id);
    debug!(subscriber = subscriber_id, "feed subscriber disconnected");
}
