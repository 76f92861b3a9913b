use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use std::time::Duration;
use tokio::time::{interval_at, timeout, Instant};

use crate::services::hub::{HubHandle, ObserverId};
use crate::AppState;

/// A single frame write that takes longer than this ends the connection.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub, state.ws_idle_timeout))
}

/// Pings go out a little before the peer's read deadline would expire.
fn ping_period(idle_timeout: Duration) -> Duration {
    (idle_timeout * 9 / 10).max(Duration::from_millis(10))
}

async fn send_frame(
    sender: &mut SplitSink<WebSocket, Message>,
    frame: Message,
) -> Result<(), &'static str> {
    match timeout(WRITE_TIMEOUT, sender.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) => Err("send failed"),
        Err(_) => Err("write timed out"),
    }
}

async fn handle_socket(socket: WebSocket, hub: HubHandle, idle_timeout: Duration) {
    let subscription = match hub.register().await {
        Ok(subscription) => subscription,
        Err(e) => {
            tracing::warn!("Refusing realtime observer: {}", e);
            return;
        }
    };
    let observer_id = subscription.id;
    let mut messages = subscription.messages;
    tracing::info!(observer_id = %observer_id, "Realtime observer connected");

    let (mut sender, mut receiver) = socket.split();

    // Drains the observer queue and keeps the peer alive with pings.
    let mut send_task = tokio::spawn(async move {
        let period = ping_period(idle_timeout);
        let mut heartbeat = interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    if let Err(reason) = send_frame(&mut sender, Message::Ping(Vec::new())).await {
                        tracing::debug!(observer_id = %observer_id, reason, "Heartbeat failed");
                        break;
                    }
                }
                next = messages.recv() => match next {
                    Some(message) => {
                        if let Err(reason) = send_frame(&mut sender, Message::Text(message.to_string())).await {
                            tracing::debug!(observer_id = %observer_id, reason, "Update not delivered");
                            break;
                        }
                    }
                    None => {
                        // Unregistered, or dropped by the hub for falling behind.
                        let _ = send_frame(&mut sender, Message::Close(None)).await;
                        break;
                    }
                },
            }
        }
    });

    // Any inbound frame, pongs included, pushes the read deadline forward.
    let mut recv_task = tokio::spawn(async move {
        loop {
            match timeout(idle_timeout, receiver.next()).await {
                Err(_) => {
                    tracing::debug!(observer_id = %observer_id, "Read deadline expired");
                    break;
                }
                Ok(None) | Ok(Some(Err(_))) | Ok(Some(Ok(Message::Close(_)))) => break,
                Ok(Some(Ok(_))) => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut recv_task) => {
            // Unregistering closes the observer queue, which ends the writer.
            if unregister(&hub, observer_id).await {
                let _ = send_task.await;
            } else {
                send_task.abort();
            }
        }
        _ = (&mut send_task) => {
            recv_task.abort();
            unregister(&hub, observer_id).await;
        }
    }

    tracing::info!(observer_id = %observer_id, "Realtime observer disconnected");
}

async fn unregister(hub: &HubHandle, observer_id: ObserverId) -> bool {
    match hub.unregister(observer_id).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(observer_id = %observer_id, "Unregister failed: {}", e);
            false
        }
    }
}
