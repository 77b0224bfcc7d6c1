use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use robot_dashboard::channel::throttle::ManualClock;
use robot_dashboard::{ControlChannel, DeviceRegistry, MockTransport, Session};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;

/// Epoch millis the manual clock starts at.
#[allow(dead_code)]
pub const START_MS: i64 = 1_700_000_000_000;
pub const MIN_INTERVAL: Duration = Duration::from_millis(50);

#[allow(dead_code)]
pub struct TestDashboard {
    pub transport: Arc<MockTransport>,
    pub clock: Arc<ManualClock>,
    pub channel: Arc<ControlChannel<MockTransport>>,
    pub session: Session<MockTransport>,
}

/// Dashboard over a mock transport with devices "1" and "2", not yet open.
#[allow(dead_code)]
pub fn closed_dashboard() -> TestDashboard {
    let transport = Arc::new(MockTransport::new());
    let clock = Arc::new(ManualClock::new(START_MS));
    let channel = Arc::new(ControlChannel::with_clock(
        transport.clone(),
        MIN_INTERVAL,
        clock.clone(),
    ));
    let session = Session::new(channel.clone(), DeviceRegistry::with_devices(["1", "2"]));

    TestDashboard {
        transport,
        clock,
        channel,
        session,
    }
}

/// Same as [`closed_dashboard`] but connected, with the `Connected` event
/// already consumed.
#[allow(dead_code)]
pub async fn open_dashboard() -> TestDashboard {
    let mut dashboard = closed_dashboard();
    dashboard.channel.open().await.unwrap();
    dashboard.session.drain_events();
    dashboard
}

/// Fake dashboard server on an ephemeral port.
///
/// On connect it pushes a telemetry frame for device "2" followed by a
/// frame that is not JSON. Every text frame it receives is forwarded to
/// the returned receiver and answered with an `ack`.
#[allow(dead_code)]
pub async fn spawn_ws_server() -> (String, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();

    let app = Router::new()
        .route("/ws/telemetry/", get(ws_handler))
        .with_state(tx);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("ws://{addr}/ws/telemetry/"), rx)
}

/// Server that holds every upgrade request for `delay` before completing
/// the handshake, then idles.
#[allow(dead_code)]
pub async fn spawn_slow_ws_server(delay: Duration) -> String {
    let app = Router::new().route(
        "/ws/telemetry/",
        get(move |ws: WebSocketUpgrade| async move {
            tokio::time::sleep(delay).await;
            ws.on_upgrade(|mut socket| async move {
                while let Some(Ok(_)) = socket.recv().await {}
            })
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("ws://{addr}/ws/telemetry/")
}

#[allow(dead_code)]
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(tx): State<mpsc::UnboundedSender<String>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_dashboard_socket(socket, tx))
}

#[allow(dead_code)]
async fn handle_dashboard_socket(mut socket: WebSocket, tx: mpsc::UnboundedSender<String>) {
    let greeting = serde_json::json!({
        "type": "telemetry_update",
        "device_id": "2",
        "battery": 50,
        "temperature": 38.5
    });
    for frame in [greeting.to_string(), "{not json".to_string()] {
        if socket.send(Message::Text(frame.into())).await.is_err() {
            return;
        }
    }

    while let Some(Ok(msg)) = socket.recv().await {
        if let Message::Text(text) = msg {
            let value: serde_json::Value =
                serde_json::from_str(text.as_str()).unwrap_or_default();
            let _ = tx.send(text.to_string());

            let ack = serde_json::json!({
                "type": "ack",
                "original_type": value["type"],
                "message": "applied"
            });
            if socket.send(Message::Text(ack.to_string().into())).await.is_err() {
                break;
            }
        }
    }
}
