use robot_dashboard::joystick::{Joysticks, Stick};
use robot_dashboard::{
    build_session, logging, ChannelEvent, Config, Session, WebSocketTransport,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let _guard = logging::init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "TELEMETRY_WS_URL must be set");
            return;
        }
    };

    let mut session = build_session(&config);
    let mut joysticks = Joysticks::new(config.joystick_sensitivity);

    info!(url = %config.telemetry_ws_url, "connecting to dashboard server");
    if let Err(e) = session.channel().open().await {
        error!(error = %e, "could not open telemetry channel");
        return;
    }

    // Operator console: `move <dx> <dy>`, `cam <dx> <dy>`, `release robot|camera`,
    // `speed <n>`, `bright <n>`.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = session.next_event() => match event {
                Some(event) => log_event(&session, &event),
                None => break,
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => run_command(&session, &mut joysticks, &line),
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!(error = %e, "failed to read operator input");
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                session.channel().close().await;
                break;
            }
        }
    }
}

fn log_event(session: &Session<WebSocketTransport>, event: &ChannelEvent) {
    match event {
        ChannelEvent::Connected => info!("telemetry channel connected"),
        ChannelEvent::ConnectionClosed => warn!("telemetry channel closed"),
        ChannelEvent::TelemetryApplied { device_id, .. } => {
            if let Some(device) = session.registry().get(device_id) {
                info!(
                    device_id = %device.id,
                    battery = device.battery,
                    cpu = device.cpu,
                    temperature = device.temperature,
                    signal = device.signal,
                    "device snapshot"
                );
            }
        }
        ChannelEvent::DeviceDisconnected { device_id } => {
            warn!(device_id = %device_id, "robot disconnected")
        }
        ChannelEvent::Error(e) => warn!(error = %e, "channel error"),
        // Already logged by the reducer.
        ChannelEvent::Acknowledged { .. } | ChannelEvent::DeviceStatus { .. } => {}
    }
}

fn run_command(session: &Session<WebSocketTransport>, joysticks: &mut Joysticks, line: &str) {
    let channel = session.channel();
    let parts: Vec<&str> = line.split_whitespace().collect();
    let number = |i: usize| parts.get(i).and_then(|v| v.parse::<f64>().ok());

    let result = match parts.as_slice() {
        ["move", ..] => match (number(1), number(2)) {
            (Some(dx), Some(dy)) => joysticks.drag(channel, Stick::Robot, dx, dy),
            _ => return usage(line, "move <dx> <dy>"),
        },
        ["cam", ..] => match (number(1), number(2)) {
            (Some(dx), Some(dy)) => joysticks.drag(channel, Stick::Camera, dx, dy),
            _ => return usage(line, "cam <dx> <dy>"),
        },
        ["release", "robot"] => joysticks.release(channel, Stick::Robot),
        ["release", "camera"] => joysticks.release(channel, Stick::Camera),
        ["speed", value] => match value.parse() {
            Ok(v) => channel.set_speed(v),
            Err(_) => return usage(line, "speed <0-255>"),
        },
        ["bright", value] => match value.parse() {
            Ok(v) => channel.set_brightness(v),
            Err(_) => return usage(line, "bright <0-255>"),
        },
        [] => return,
        _ => return usage(line, "move | cam | release | speed | bright"),
    };

    if let Err(e) = result {
        warn!(error = %e, "command not sent");
    }
}

fn usage(line: &str, expected: &str) {
    warn!(line, expected, "unrecognised operator command");
}
