//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::session::{ConnectionId, SessionHub};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let hub = state.hub.clone();
    let connection_id = hub.connect();
    info!(connection_id = %connection_id, "New WebSocket connection");

    let (mut ws_sink, mut ws_stream) = socket.split();
    let (outbound_tx, mut outbound_rx) =
        mpsc::channel::<ServerMsg>(state.config.outbound_queue_capacity);
    let rate_limiter = ConnectionRateLimiter::new(state.config.input_rate_limit);

    // Writer task: outbound queue -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> hub
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMsg>(&text) {
                Ok(client_msg) => {
                    handle_client_msg(&hub, connection_id, client_msg, &outbound_tx, &rate_limiter);
                }
                Err(e) => {
                    warn!(connection_id = %connection_id, error = %e, "Failed to parse client message");
                    let _ = outbound_tx
                        .try_send(ServerMsg::error("bad_message", format!("Invalid message: {}", e)));
                }
            },
            Ok(Message::Binary(_)) => {
                warn!(connection_id = %connection_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(connection_id = %connection_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(connection_id = %connection_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    hub.on_disconnect(connection_id);
    writer_handle.abort();

    info!(
        connection_id = %connection_id,
        participant_count = hub.participant_count(),
        "WebSocket connection closed"
    );
}

/// Dispatch one parsed client message to the hub.
///
/// Only relay traffic is rate limited; join, leave and ping always go
/// through.
pub fn handle_client_msg(
    hub: &SessionHub,
    connection_id: ConnectionId,
    msg: ClientMsg,
    outbound: &mpsc::Sender<ServerMsg>,
    rate_limiter: &ConnectionRateLimiter,
) {
    let msg = match msg.into_relay() {
        Ok(event) => {
            if !rate_limiter.check_relay() {
                warn!(connection_id = %connection_id, kind = event.kind(), "Rate limited relay message");
                return;
            }
            hub.on_relay(connection_id, event);
            return;
        }
        Err(other) => other,
    };

    match msg {
        ClientMsg::Join { display_name } => {
            let display_name = resolve_display_name(connection_id, display_name);
            // Rejections are answered with a join_result by the hub
            let _ = hub.on_join(connection_id, display_name, outbound.clone());
        }
        ClientMsg::Leave => {
            hub.on_leave(connection_id);
        }
        ClientMsg::Ping { t } => {
            let _ = outbound.try_send(ServerMsg::Pong { t });
        }
        _ => {}
    }
}

/// Fall back to a name derived from the connection id when the client
/// sends a blank one
fn resolve_display_name(connection_id: ConnectionId, display_name: String) -> String {
    if display_name.trim().is_empty() {
        format!("Player_{}", &connection_id.simple().to_string()[..8])
    } else {
        display_name
    }
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::{MirrorAction, PeerMirror};
    use crate::session::ConnectionPhase;
    use crate::ws::protocol::{HealthData, PositionData, Slot};
    use std::time::Instant;

    fn drain(rx: &mut mpsc::Receiver<ServerMsg>) -> Vec<ServerMsg> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn join(name: &str) -> ClientMsg {
        ClientMsg::Join {
            display_name: name.to_string(),
        }
    }

    #[test]
    fn test_ping_answered_before_join() {
        let hub = SessionHub::new();
        let id = hub.connect();
        let (tx, mut rx) = mpsc::channel(8);
        let limiter = ConnectionRateLimiter::default();

        handle_client_msg(&hub, id, ClientMsg::Ping { t: 42 }, &tx, &limiter);

        assert_eq!(drain(&mut rx), vec![ServerMsg::Pong { t: 42 }]);
        assert_eq!(hub.phase(&id), Some(ConnectionPhase::Unjoined));
    }

    #[test]
    fn test_blank_name_gets_connection_derived_default() {
        let hub = SessionHub::new();
        let id = hub.connect();
        let (tx, mut rx) = mpsc::channel(8);
        let limiter = ConnectionRateLimiter::default();

        handle_client_msg(&hub, id, join("   "), &tx, &limiter);

        let expected = format!("Player_{}", &id.simple().to_string()[..8]);
        let names: Vec<String> = drain(&mut rx)
            .into_iter()
            .filter_map(|m| match m {
                ServerMsg::Joined { display_name, .. } => Some(display_name),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec![expected]);
    }

    #[test]
    fn test_renamed_joiner_mirror_spawns_itself_locally() {
        let hub = SessionHub::new();
        let id = hub.connect();
        let (tx, mut rx) = mpsc::channel(8);
        let limiter = ConnectionRateLimiter::default();

        handle_client_msg(&hub, id, join(""), &tx, &limiter);

        let server_name = format!("Player_{}", &id.simple().to_string()[..8]);
        let mut mirror = PeerMirror::new("");
        let now = Instant::now();
        let actions: Vec<MirrorAction> = drain(&mut rx)
            .into_iter()
            .flat_map(|msg| mirror.apply(msg, now))
            .collect();

        assert_eq!(
            actions,
            vec![
                MirrorAction::Admitted { slot: Slot::ONE },
                MirrorAction::SpawnLocal {
                    slot: Slot::ONE,
                    display_name: server_name.clone()
                },
            ]
        );
        assert_eq!(mirror.roster().get(&Slot::ONE), Some(&server_name));
        assert!(mirror.roster().get(&Slot::TWO).is_none());
    }

    #[test]
    fn test_relay_reaches_peer_only() {
        let hub = SessionHub::new();
        let limiter = ConnectionRateLimiter::default();
        let a = hub.connect();
        let b = hub.connect();
        let (tx_a, mut rx_a) = mpsc::channel(16);
        let (tx_b, mut rx_b) = mpsc::channel(16);

        handle_client_msg(&hub, a, join("alpha"), &tx_a, &limiter);
        handle_client_msg(&hub, b, join("bravo"), &tx_b, &limiter);
        drain(&mut rx_a);
        drain(&mut rx_b);

        handle_client_msg(
            &hub,
            a,
            ClientMsg::HealthUpdate(HealthData {
                slot: 2,
                current_health: 40.0,
            }),
            &tx_a,
            &limiter,
        );

        assert!(drain(&mut rx_a).is_empty());
        assert_eq!(
            drain(&mut rx_b),
            vec![ServerMsg::HealthUpdate(HealthData {
                slot: 1,
                current_health: 40.0,
            })]
        );
    }

    #[test]
    fn test_rate_limit_drops_relay_but_not_leave() {
        let hub = SessionHub::new();
        let limiter = ConnectionRateLimiter::new(1);
        let a = hub.connect();
        let b = hub.connect();
        let (tx_a, mut rx_a) = mpsc::channel(64);
        let (tx_b, mut rx_b) = mpsc::channel(64);

        handle_client_msg(&hub, a, join("alpha"), &tx_a, &limiter);
        handle_client_msg(&hub, b, join("bravo"), &tx_b, &limiter);
        drain(&mut rx_b);

        for _ in 0..10 {
            handle_client_msg(
                &hub,
                a,
                ClientMsg::PositionUpdate(PositionData::default()),
                &tx_a,
                &limiter,
            );
        }
        let relayed = drain(&mut rx_b)
            .into_iter()
            .filter(|m| matches!(m, ServerMsg::PositionUpdate(_)))
            .count();
        assert!(relayed < 10);

        handle_client_msg(&hub, a, ClientMsg::Leave, &tx_a, &limiter);
        assert_eq!(drain(&mut rx_b), vec![ServerMsg::Left { slot: 1 }]);
        drain(&mut rx_a);
        assert_eq!(hub.participant_count(), 1);
    }
}
