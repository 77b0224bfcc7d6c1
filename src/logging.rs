// Logging initialisation.
//
// Writes structured logs to both stdout and `./logs/dashboard.log`.
// The level comes from `RUST_LOG` (defaults to `info`, with the websocket
// stack held at `warn`).
//
// To see every control frame:  `RUST_LOG=robot_dashboard=debug`
// To include throttled drops:  `RUST_LOG=robot_dashboard=trace`

use tracing_appender::non_blocking;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Initialise the global tracing subscriber.
//
// The returned [`WorkerGuard`] must stay alive for the whole program;
// dropping it early loses buffered log lines.
pub fn init() -> non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::never("./logs", "dashboard.log");
    let (file_writer, guard) = non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,tungstenite=warn,tokio_tungstenite=warn,rustls=warn")
    });

    let stdout_layer = fmt::layer().with_target(true).with_ansi(true);

    // Plain text for the file (no ANSI escape codes).
    let file_layer = fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}
