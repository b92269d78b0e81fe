#![allow(missing_docs, clippy::panic)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt, stream};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use alert_gateway::api;
use alert_gateway::app_state::AppState;
use alert_gateway::hub::{Hub, HubConfig, HubHandle};
use alert_gateway::relay::RelayBridge;
use alert_gateway::ws::ConnectionSettings;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WILDFIRE: &str = r#"{"id":"n1","type":"alert","category":"wildfire","title":"Fire","message":"..","severity":"critical","created_at":"2024-01-01T00:00:00Z","read":false}"#;
const FLOOD: &str = r#"{"id":"n2","type":"alert","category":"flood","title":"Flood","message":"river rising","severity":"warning","event_id":"EONET_42","coordinates":[-90.1,29.9],"created_at":"2024-01-01T01:00:00Z","read":false}"#;
const WILDFIRE_AGAIN: &str = r#"{"id":"n3","type":"alert","category":"wildfire","title":"Fire 2","message":"spreading","severity":"critical","created_at":"2024-01-01T02:00:00Z","read":false}"#;

const WAIT: Duration = Duration::from_secs(5);

struct TestGateway {
    addr: SocketAddr,
    hub: HubHandle,
    relay: mpsc::Sender<String>,
}

impl TestGateway {
    async fn start() -> Self {
        Self::start_with(HubConfig::default(), ConnectionSettings::default()).await
    }

    async fn start_with(hub_config: HubConfig, settings: ConnectionSettings) -> Self {
        let (hub, _hub_task) = Hub::spawn(hub_config);

        let (relay, relay_rx) = mpsc::channel::<String>(16);
        let payloads = Box::pin(stream::unfold(relay_rx, |mut rx| async move {
            rx.recv().await.map(|payload| (payload, rx))
        }));
        tokio::spawn(RelayBridge::new(hub.clone(), "notifications").run(payloads));

        let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("no local addr");
        };
        let app = api::app(AppState::new(hub.clone(), settings));
        tokio::spawn(async move { axum::serve(listener, app).await });

        Self { addr, hub, relay }
    }

    async fn connect(&self) -> Client {
        let url = format!("ws://{}/ws", self.addr);
        let Ok((client, _response)) = tokio_tungstenite::connect_async(url).await else {
            panic!("websocket connect failed");
        };
        client
    }

    async fn publish(&self, payload: &str) {
        if self.relay.send(payload.to_string()).await.is_err() {
            panic!("relay stopped");
        }
    }

    async fn wait_for_connections(&self, expected: usize) {
        let waited = tokio::time::timeout(WAIT, async {
            loop {
                if matches!(self.hub.connection_count().await, Ok(n) if n == expected) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        if waited.is_err() {
            panic!("expected {expected} registered connections");
        }
    }
}

async fn send_text(client: &mut Client, text: &str) {
    if client.send(Message::text(text.to_owned())).await.is_err() {
        panic!("send failed");
    }
}

/// Round-trips a ping; the server handles frames in order, so every frame
/// sent before it has been applied once the pong arrives.
async fn sync(client: &mut Client) {
    if client.send(Message::Ping("sync".into())).await.is_err() {
        panic!("ping failed");
    }
    let waited = tokio::time::timeout(WAIT, async {
        while let Some(Ok(frame)) = client.next().await {
            if matches!(frame, Message::Pong(_)) {
                return true;
            }
        }
        false
    })
    .await;
    if !matches!(waited, Ok(true)) {
        panic!("no pong from server");
    }
}

async fn next_notification(client: &mut Client) -> serde_json::Value {
    let waited = tokio::time::timeout(WAIT, async {
        while let Some(Ok(frame)) = client.next().await {
            if let Message::Text(text) = frame {
                return serde_json::from_str(text.as_str()).ok();
            }
        }
        None
    })
    .await;
    match waited {
        Ok(Some(value)) => value,
        _ => panic!("expected a notification"),
    }
}

fn json(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_default()
}

#[tokio::test]
async fn category_fan_out_end_to_end() {
    let gw = TestGateway::start().await;
    let mut x = gw.connect().await;
    let mut y = gw.connect().await;
    let mut z = gw.connect().await;
    gw.wait_for_connections(3).await;

    send_text(&mut x, r#"{"action":"subscribe","categories":["wildfire"]}"#).await;
    send_text(&mut z, r#"{"action":"subscribe","categories":["flood"]}"#).await;
    sync(&mut x).await;
    sync(&mut z).await;

    gw.publish(WILDFIRE).await;
    gw.publish(FLOOD).await;
    gw.publish(WILDFIRE_AGAIN).await;

    assert_eq!(next_notification(&mut x).await, json(WILDFIRE));
    assert_eq!(next_notification(&mut x).await, json(WILDFIRE_AGAIN));

    assert_eq!(next_notification(&mut y).await, json(WILDFIRE));
    assert_eq!(next_notification(&mut y).await, json(FLOOD));
    assert_eq!(next_notification(&mut y).await, json(WILDFIRE_AGAIN));

    assert_eq!(next_notification(&mut z).await, json(FLOOD));
}

#[tokio::test]
async fn malformed_relay_payload_is_skipped() {
    let gw = TestGateway::start().await;
    let mut client = gw.connect().await;
    gw.wait_for_connections(1).await;

    gw.publish("definitely not json").await;
    gw.publish(r#"{"id":"n9","type":"alert"}"#).await;
    gw.publish(WILDFIRE).await;

    assert_eq!(next_notification(&mut client).await, json(WILDFIRE));
}

#[tokio::test]
async fn binary_frame_disconnects_only_that_client() {
    let gw = TestGateway::start().await;
    let mut bad = gw.connect().await;
    let mut good = gw.connect().await;
    gw.wait_for_connections(2).await;

    if bad.send(Message::binary(vec![1u8, 2, 3])).await.is_err() {
        panic!("send failed");
    }
    gw.wait_for_connections(1).await;

    gw.publish(FLOOD).await;
    assert_eq!(next_notification(&mut good).await, json(FLOOD));
}

#[tokio::test]
async fn client_close_unregisters() {
    let gw = TestGateway::start().await;
    let mut client = gw.connect().await;
    gw.wait_for_connections(1).await;

    if client.close(None).await.is_err() {
        panic!("close failed");
    }
    gw.wait_for_connections(0).await;
}

#[tokio::test]
async fn geo_subscription_over_websocket() {
    let gw = TestGateway::start().await;
    let mut client = gw.connect().await;
    gw.wait_for_connections(1).await;

    send_text(
        &mut client,
        r#"{"action":"subscribe","coordinates":[-90.1,29.9],"radius":5}"#,
    )
    .await;
    sync(&mut client).await;

    let far = r#"{"id":"far","type":"alert","category":"flood","title":"t","message":"m","severity":"info","coordinates":[-80.0,25.0],"created_at":"2024-01-01T00:00:00Z","read":false}"#;
    gw.publish(far).await;
    gw.publish(FLOOD).await;

    assert_eq!(next_notification(&mut client).await, json(FLOOD));
}

#[tokio::test]
async fn health_reports_up() {
    let gw = TestGateway::start().await;
    let Ok(response) = reqwest::get(format!("http://{}/health", gw.addr)).await else {
        panic!("health request failed");
    };
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let Ok(body) = response.json::<serde_json::Value>().await else {
        panic!("health body is not json");
    };
    assert_eq!(
        body.get("status").and_then(serde_json::Value::as_str),
        Some("healthy")
    );
}

fn large_notification(id: usize) -> String {
    serde_json::json!({
        "id": format!("big-{id}"),
        "type": "alert",
        "category": "flood",
        "title": "Flood",
        "message": "x".repeat(1 << 20),
        "severity": "warning",
        "created_at": "2024-01-01T00:00:00Z",
        "read": false,
    })
    .to_string()
}

#[tokio::test]
async fn stalled_reader_is_dropped_after_send_timeout() {
    let settings = ConnectionSettings {
        outbound_buffer: 256,
        send_timeout: Duration::from_millis(300),
        ..ConnectionSettings::default()
    };
    let gw = TestGateway::start_with(HubConfig::default(), settings).await;
    let stalled = gw.connect().await;
    gw.wait_for_connections(1).await;

    // The queue never fills, so only a blocked socket write can drop it.
    for id in 0..32 {
        gw.publish(&large_notification(id)).await;
    }
    gw.wait_for_connections(0).await;
    drop(stalled);
}

#[tokio::test]
async fn pong_replies_keep_connection_alive() {
    let hub_config = HubConfig {
        ping_interval: Duration::from_millis(100),
        ..HubConfig::default()
    };
    let settings = ConnectionSettings {
        read_timeout: Duration::from_millis(250),
        ..ConnectionSettings::default()
    };
    let gw = TestGateway::start_with(hub_config, settings).await;
    let mut responsive = gw.connect().await;
    let silent = gw.connect().await;
    gw.wait_for_connections(2).await;

    // Reading lets the client answer pings automatically.
    let reader = tokio::spawn(async move {
        while let Some(Ok(frame)) = responsive.next().await {
            if let Message::Text(text) = frame {
                return serde_json::from_str::<serde_json::Value>(text.as_str()).ok();
            }
        }
        None
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    gw.wait_for_connections(1).await;

    gw.publish(FLOOD).await;
    let Ok(Ok(Some(received))) = tokio::time::timeout(WAIT, reader).await else {
        panic!("responsive client should still receive notifications");
    };
    assert_eq!(received, json(FLOOD));
    drop(silent);
}
