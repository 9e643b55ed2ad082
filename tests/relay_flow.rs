//! End-to-end relay flow over real WebSocket connections

use std::net::SocketAddr;
use std::time::Duration;

use duel_relay::app::AppState;
use duel_relay::config::Config;
use duel_relay::http::build_router;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server() -> (SocketAddr, AppState) {
    let state = AppState::new(Config::default());
    let router = build_router(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (addr, state)
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = tokio_test::assert_ok!(connect_async(format!("ws://{}/ws", addr)).await);
    client
}

async fn send(client: &mut Client, msg: Value) {
    client.send(Message::Text(msg.to_string())).await.unwrap();
}

async fn recv(client: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for message")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn join(client: &mut Client, name: &str) {
    send(client, json!({ "type": "join", "display_name": name })).await;
}

#[tokio::test]
async fn test_two_player_match_flow() {
    let (addr, state) = spawn_server().await;

    let mut alpha = connect(addr).await;
    join(&mut alpha, "alpha").await;
    assert_eq!(
        recv(&mut alpha).await,
        json!({ "type": "join_result", "accepted": true, "slot": 1 })
    );
    assert_eq!(
        recv(&mut alpha).await,
        json!({ "type": "joined", "slot": 1, "display_name": "alpha" })
    );

    let mut bravo = connect(addr).await;
    join(&mut bravo, "bravo").await;
    assert_eq!(
        recv(&mut bravo).await,
        json!({ "type": "join_result", "accepted": true, "slot": 2 })
    );
    assert_eq!(
        recv(&mut bravo).await,
        json!({ "type": "joined", "slot": 1, "display_name": "alpha" })
    );
    assert_eq!(
        recv(&mut bravo).await,
        json!({ "type": "joined", "slot": 2, "display_name": "bravo" })
    );
    assert_eq!(recv(&mut bravo).await, json!({ "type": "match_started" }));

    assert_eq!(
        recv(&mut alpha).await,
        json!({ "type": "joined", "slot": 2, "display_name": "bravo" })
    );
    assert_eq!(recv(&mut alpha).await, json!({ "type": "match_started" }));

    // Asserted slot is overwritten with the sender's registered one
    send(
        &mut alpha,
        json!({
            "type": "position_update",
            "slot": 2,
            "pos_x": 1.0, "pos_y": 0.0, "pos_z": 3.0, "rot_y": 90.0
        }),
    )
    .await;
    let relayed = recv(&mut bravo).await;
    assert_eq!(relayed["type"], "position_update");
    assert_eq!(relayed["slot"], 1);
    assert_eq!(relayed["pos_z"], 3.0);

    // Third connection is refused
    let mut charlie = connect(addr).await;
    join(&mut charlie, "charlie").await;
    assert_eq!(
        recv(&mut charlie).await,
        json!({ "type": "join_result", "accepted": false, "reason": "full" })
    );

    // Ping is answered on the sender only
    send(&mut charlie, json!({ "type": "ping", "t": 77 })).await;
    assert_eq!(recv(&mut charlie).await, json!({ "type": "pong", "t": 77 }));

    alpha.close(None).await.unwrap();
    assert_eq!(recv(&mut bravo).await, json!({ "type": "left", "slot": 1 }));

    let mut stopped = false;
    for _ in 0..50 {
        if state.hub.participant_count() == 1 && state.hub.match_state() == "stopped" {
            stopped = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(stopped);
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection_open() {
    let (addr, _state) = spawn_server().await;
    let mut client = connect(addr).await;

    client
        .send(Message::Text("{not json".to_string()))
        .await
        .unwrap();
    let reply = recv(&mut client).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["code"], "bad_message");

    join(&mut client, "delta").await;
    assert_eq!(recv(&mut client).await["accepted"], true);
}
