use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::channel::models::TelemetryFields;

/// Device id used when a telemetry frame does not name one.
pub const DEFAULT_FALLBACK_DEVICE_ID: &str = "1";

/// Latest known snapshot of one robot unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub battery: f64,
    pub cpu: f64,
    pub temperature: f64,
    pub signal: f64,
    // Simulated-only; never touched by telemetry.
    pub memory: Option<f64>,
    pub storage: Option<f64>,
    pub download: Option<f64>,
    pub upload: Option<f64>,
}

impl Device {
    pub fn placeholder(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: format!("Device {id}"),
            id,
            battery: 0.0,
            cpu: 0.0,
            temperature: 0.0,
            signal: 0.0,
            memory: None,
            storage: None,
            download: None,
            upload: None,
        }
    }

    /// Overwrite only the metrics present in `fields`.
    pub fn merge(&mut self, fields: &TelemetryFields) {
        if let Some(battery) = fields.battery {
            self.battery = battery;
        }
        if let Some(cpu) = fields.cpu {
            self.cpu = cpu;
        }
        if let Some(temperature) = fields.temperature {
            self.temperature = temperature;
        }
        if let Some(signal) = fields.signal {
            self.signal = signal;
        }
    }
}

/// In-memory map from device id to its latest telemetry snapshot.
///
/// Devices are only ever added, never removed, during a session.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRegistry {
    fallback_id: String,
    devices: BTreeMap<String, Device>,
}

impl DeviceRegistry {
    /// An empty registry whose canonical fallback id is `fallback_id`.
    pub fn new(fallback_id: impl Into<String>) -> Self {
        Self {
            fallback_id: fallback_id.into(),
            devices: BTreeMap::new(),
        }
    }

    /// Provision placeholder devices; the first id becomes the fallback.
    pub fn with_devices<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ids = ids.into_iter().map(Into::into).peekable();
        let fallback = ids
            .peek()
            .cloned()
            .unwrap_or_else(|| DEFAULT_FALLBACK_DEVICE_ID.to_string());
        let mut registry = Self::new(fallback);
        for id in ids {
            registry.provision(Device::placeholder(id));
        }
        registry
    }

    pub fn fallback_id(&self) -> &str {
        &self.fallback_id
    }

    /// Insert `device` unless its id is already tracked.
    pub fn provision(&mut self, device: Device) {
        self.devices.entry(device.id.clone()).or_insert(device);
    }

    pub fn get(&self, id: &str) -> Option<&Device> {
        self.devices.get(id)
    }

    /// The record for `id`, provisioning a placeholder on first sight.
    pub fn get_or_provision(&mut self, id: &str) -> &mut Device {
        self.devices.entry(id.to_string()).or_insert_with(|| {
            tracing::info!(device_id = %id, "provisioning device first seen in telemetry");
            Device::placeholder(id)
        })
    }

    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::with_devices([DEFAULT_FALLBACK_DEVICE_ID])
    }
}
