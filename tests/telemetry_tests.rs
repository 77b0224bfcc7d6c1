use robot_dashboard::{ChannelError, ChannelEvent, TelemetryFields};
use serde_json::json;

mod common;

use common::{closed_dashboard, open_dashboard};

// ---------------------------------------------------------------------------
// 1. Partial update only touches the fields it carries
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_partial_update_keeps_other_fields() {
    let mut app = open_dashboard().await;

    app.transport.inject(json!({"type": "telemetry_update", "device_id": "2", "cpu": 44}));
    app.transport.inject(json!({"type": "telemetry_update", "device_id": "2", "battery": 50}));
    let events = app.session.drain_events();

    assert_eq!(events.len(), 2);
    assert_eq!(
        events[1],
        ChannelEvent::TelemetryApplied {
            device_id: "2".to_string(),
            fields: TelemetryFields {
                battery: Some(50.0),
                ..Default::default()
            },
        }
    );
    let device = app.session.registry().get("2").unwrap();
    assert_eq!(device.cpu, 44.0);
    assert_eq!(device.battery, 50.0);
}

// ---------------------------------------------------------------------------
// 2. Missing device_id goes to the fallback device
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_missing_device_id_uses_fallback() {
    let mut app = open_dashboard().await;

    app.transport.inject_telemetry(
        None,
        &TelemetryFields {
            battery: Some(81.0),
            signal: Some(93.0),
            ..Default::default()
        },
    );
    let event = app.session.try_next_event().unwrap();

    assert!(matches!(
        event,
        ChannelEvent::TelemetryApplied { ref device_id, .. } if device_id == "1"
    ));
    let device = app.session.registry().get("1").unwrap();
    assert_eq!(device.battery, 81.0);
    assert_eq!(device.signal, 93.0);
    assert_eq!(app.session.registry().get("2").unwrap().battery, 0.0);
}

// ---------------------------------------------------------------------------
// 3. "disconnected" status emits exactly one DeviceDisconnected, no metric change
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_disconnected_status_emits_one_event() {
    let mut app = open_dashboard().await;
    let before = app.session.registry().clone();

    app.transport
        .inject(json!({"type": "robot_status", "device_id": "1", "status": "disconnected"}));
    let events = app.session.drain_events();

    assert_eq!(
        events,
        vec![ChannelEvent::DeviceDisconnected {
            device_id: "1".to_string()
        }]
    );
    assert_eq!(app.session.registry(), &before);
}

// ---------------------------------------------------------------------------
// 4. Other statuses pass through as a generic status event
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_other_status_passes_through() {
    let mut app = open_dashboard().await;

    app.transport
        .inject(json!({"type": "robot_status", "device_id": "2", "status": "charging"}));

    assert_eq!(
        app.session.try_next_event(),
        Some(ChannelEvent::DeviceStatus {
            device_id: "2".to_string(),
            status: "charging".to_string()
        })
    );
}

// ---------------------------------------------------------------------------
// 5. Malformed JSON raises an error event and leaves the registry alone
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_malformed_json_leaves_registry_unchanged() {
    let mut app = open_dashboard().await;
    let before = app.session.registry().clone();

    app.transport.inject_text("{\"type\": \"telemetry_update\", \"battery\": ");
    let event = app.session.try_next_event().unwrap();

    match event {
        ChannelEvent::Error(ChannelError::MalformedInbound { raw, .. }) => {
            assert!(raw.starts_with("{\"type\""));
        }
        other => panic!("expected MalformedInbound, got {other:?}"),
    }
    assert_eq!(app.session.registry(), &before);
}

// ---------------------------------------------------------------------------
// 6. Known type with a bad field is reported, not applied
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_bad_field_type_is_reported() {
    let mut app = open_dashboard().await;
    let before = app.session.registry().clone();

    app.transport
        .inject(json!({"type": "telemetry_update", "device_id": "1", "battery": "full"}));

    assert!(matches!(
        app.session.try_next_event(),
        Some(ChannelEvent::Error(ChannelError::MalformedInbound { .. }))
    ));
    assert_eq!(app.session.registry(), &before);
}

// ---------------------------------------------------------------------------
// 7. Unknown and untyped frames are dropped silently
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_unknown_types_are_ignored() {
    let mut app = open_dashboard().await;

    app.transport.inject(json!({"type": "video_frame", "data": "AAAA"}));
    app.transport
        .inject(json!({"status": "connected", "message": "Telemetry WebSocket active"}));
    app.transport.inject(json!({"type": "ack", "original_type": "set_speed"}));

    assert_eq!(
        app.session.drain_events(),
        vec![ChannelEvent::Acknowledged {
            original_type: "set_speed".to_string(),
            message: None
        }]
    );
}

// ---------------------------------------------------------------------------
// 8. Telemetry for an unprovisioned device provisions it
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_unknown_device_is_provisioned() {
    let mut app = open_dashboard().await;

    app.transport
        .inject(json!({"type": "telemetry_update", "device_id": "robot_01", "temperature": 35.5}));
    app.session.drain_events();

    let device = app.session.registry().get("robot_01").unwrap();
    assert_eq!(device.name, "Device robot_01");
    assert_eq!(device.temperature, 35.5);
    assert_eq!(app.session.registry().len(), 3);
}

// ---------------------------------------------------------------------------
// 9. Closing stops inbound delivery
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_close_stops_inbound_delivery() {
    let mut app = open_dashboard().await;

    app.channel.close().await;
    app.transport.inject(json!({"type": "telemetry_update", "battery": 1}));

    assert_eq!(
        app.session.drain_events(),
        vec![ChannelEvent::ConnectionClosed]
    );
    assert_eq!(app.session.registry().get("1").unwrap().battery, 0.0);
}

// ---------------------------------------------------------------------------
// 10. Lifecycle events surface through the session
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_lifecycle_events() {
    let mut app = closed_dashboard();

    app.channel.open().await.unwrap();
    assert_eq!(app.session.next_event().await, Some(ChannelEvent::Connected));

    app.transport.drop_connection();
    assert_eq!(
        app.session.next_event().await,
        Some(ChannelEvent::ConnectionClosed)
    );
    assert!(!app.channel.is_open());
}

// ---------------------------------------------------------------------------
// 11. A stream of synthetic telemetry ends on the latest values
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_synthetic_telemetry_stream() {
    let mut app = open_dashboard().await;

    for tick in 0..20 {
        let fields = TelemetryFields {
            battery: Some(85.0 - tick as f64 * 0.5),
            cpu: (tick % 2 == 0).then_some(40.0 + tick as f64),
            temperature: None,
            signal: Some(90.0),
        };
        app.transport.inject_telemetry(Some("1"), &fields);
    }
    let events = app.session.drain_events();

    assert_eq!(events.len(), 20);
    let device = app.session.registry().get("1").unwrap();
    assert_eq!(device.battery, 75.5);
    assert_eq!(device.cpu, 58.0);
    assert_eq!(device.temperature, 0.0);
}

// ---------------------------------------------------------------------------
// 12. Empty device ids fall back; numeric ids are read as strings
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_device_id_empty_or_numeric() {
    let mut app = open_dashboard().await;

    app.transport
        .inject(json!({"type": "telemetry_update", "device_id": "", "battery": 77}));
    app.transport
        .inject(json!({"type": "telemetry_update", "device_id": 2, "battery": 64}));
    let events = app.session.drain_events();

    assert!(matches!(
        &events[..],
        [
            ChannelEvent::TelemetryApplied { device_id: first, .. },
            ChannelEvent::TelemetryApplied { device_id: second, .. },
        ] if first == "1" && second == "2"
    ));
    assert_eq!(app.session.registry().len(), 2);
    assert!(app.session.registry().get("").is_none());
    assert_eq!(app.session.registry().get("1").unwrap().battery, 77.0);
    assert_eq!(app.session.registry().get("2").unwrap().battery, 64.0);
}

// ---------------------------------------------------------------------------
// 13. A session that falls far behind still folds every frame
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_backlog_is_not_dropped() {
    let mut app = open_dashboard().await;

    app.transport
        .inject(json!({"type": "telemetry_update", "device_id": "2", "cpu": 99}));
    for tick in 0..1_000 {
        app.transport
            .inject(json!({"type": "telemetry_update", "device_id": "1", "battery": tick}));
    }
    let events = app.session.drain_events();

    assert_eq!(events.len(), 1_001);
    assert_eq!(app.session.registry().get("2").unwrap().cpu, 99.0);
    assert_eq!(app.session.registry().get("1").unwrap().battery, 999.0);
}
