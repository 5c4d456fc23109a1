//! Network configuration baked into generated firmware.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_BROKER: &str = "broker.hivemq.com";
pub const DEFAULT_PORT: u16 = 1883;

/// WiFi credentials and MQTT broker settings for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub ssid: String,
    pub password: String,
    pub broker: String,
    pub port: u16,
    /// MQTT client id and topic namespace, also names the output file
    pub device_id: String,
}

impl NetworkConfig {
    pub fn with_device_id(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            ..Self::default()
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            ssid: String::new(),
            password: String::new(),
            broker: DEFAULT_BROKER.to_string(),
            port: DEFAULT_PORT,
            device_id: format!("micro_node_{}", Uuid::new_v4().as_u128() % 1000),
        }
    }
}
