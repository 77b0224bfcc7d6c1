use std::env;
use std::time::Duration;

use crate::channel::throttle::DEFAULT_MIN_INTERVAL;
use crate::joystick::DEFAULT_SENSITIVITY;
use crate::telemetry::registry::DEFAULT_FALLBACK_DEVICE_ID;

#[derive(Clone, Debug)]
pub struct Config {
    pub telemetry_ws_url: String,
    pub min_send_interval: Duration,
    pub joystick_sensitivity: f64,
    /// Devices provisioned at startup; the first is the fallback id.
    pub device_ids: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Config {
            telemetry_ws_url: env::var("TELEMETRY_WS_URL")?,
            min_send_interval: parse_min_interval(env::var("CONTROL_MIN_INTERVAL_MS").ok()),
            joystick_sensitivity: env::var("JOYSTICK_SENSITIVITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SENSITIVITY),
            device_ids: parse_device_ids(
                &env::var("DEVICE_IDS").unwrap_or_else(|_| "1,2".to_string()),
            ),
        })
    }
}

/// Unset, unparsable or zero values fall back to the default interval.
fn parse_min_interval(raw: Option<String>) -> Duration {
    let Some(raw) = raw else {
        return DEFAULT_MIN_INTERVAL;
    };
    match raw.trim().parse::<u64>() {
        Ok(millis) if millis > 0 => Duration::from_millis(millis),
        _ => {
            tracing::warn!(
                value = %raw,
                default_ms = DEFAULT_MIN_INTERVAL.as_millis() as u64,
                "CONTROL_MIN_INTERVAL_MS must be a positive number of milliseconds"
            );
            DEFAULT_MIN_INTERVAL
        }
    }
}

fn parse_device_ids(raw: &str) -> Vec<String> {
    let ids: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    if ids.is_empty() {
        vec![DEFAULT_FALLBACK_DEVICE_ID.to_string()]
    } else {
        ids
    }
}
