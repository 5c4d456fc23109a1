//! Board Definitions
//!
//! Static description of a development board's header pins: which GPIO each
//! pin maps to, which electrical functions it can serve, and whether using it
//! carries a boot-time or shared-function hazard.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One electrical function a pin can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PinCapability {
    DigitalIn,
    DigitalOut,
    AnalogIn,
    AnalogOut,
    Pwm,
    I2c,
    Spi,
    Uart,
    Power,
    Gnd,
}

impl PinCapability {
    pub const ALL: [PinCapability; 10] = [
        PinCapability::DigitalIn,
        PinCapability::DigitalOut,
        PinCapability::AnalogIn,
        PinCapability::AnalogOut,
        PinCapability::Pwm,
        PinCapability::I2c,
        PinCapability::Spi,
        PinCapability::Uart,
        PinCapability::Power,
        PinCapability::Gnd,
    ];

    /// Tag as written in catalogs and reservation labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            PinCapability::DigitalIn => "digital-in",
            PinCapability::DigitalOut => "digital-out",
            PinCapability::AnalogIn => "analog-in",
            PinCapability::AnalogOut => "analog-out",
            PinCapability::Pwm => "pwm",
            PinCapability::I2c => "i2c",
            PinCapability::Spi => "spi",
            PinCapability::Uart => "uart",
            PinCapability::Power => "power",
            PinCapability::Gnd => "gnd",
        }
    }
}

impl fmt::Display for PinCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PinCapability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PinCapability::ALL
            .iter()
            .copied()
            .find(|cap| cap.as_str() == s)
            .ok_or_else(|| format!("unknown pin capability '{}'", s))
    }
}

/// Shared buses a module can declare instead of individual pin requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusType {
    I2c,
    Spi,
}

impl BusType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusType::I2c => "i2c",
            BusType::Spi => "spi",
        }
    }
}

impl fmt::Display for BusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Microcontroller family; selects the WiFi/mDNS headers in generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum McuFamily {
    Esp32,
    Esp8266,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BootState {
    High,
    Low,
    Floating,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinDefinition {
    /// GPIO number used in code
    pub gpio: u8,

    /// Label printed on the board silkscreen (e.g. D1, RX)
    pub label: String,

    pub capabilities: Vec<PinCapability>,

    #[serde(default)]
    pub adc_channel: Option<u8>,

    /// Usable, but discouraged (boot strapping, flash, USB serial, ...)
    #[serde(default)]
    pub restricted: bool,

    #[serde(default)]
    pub restriction_reason: Option<String>,

    #[serde(default)]
    pub boot_state: Option<BootState>,
}

impl PinDefinition {
    pub fn has_capability(&self, capability: PinCapability) -> bool {
        self.capabilities.contains(&capability)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct I2cPins {
    pub sda: u8,
    pub scl: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpiPins {
    pub mosi: u8,
    pub miso: u8,
    pub clk: u8,
    pub cs: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardDefinition {
    pub id: String,
    pub name: String,
    pub mcu: McuFamily,
    /// Header pins in board declaration order; allocation tie-breaks follow it.
    pub pins: Vec<PinDefinition>,
    pub default_i2c: I2cPins,
    pub default_spi: SpiPins,
    /// Estimated regulator limit in mA
    #[serde(default)]
    pub max_current_total_ma: Option<u32>,
}

impl BoardDefinition {
    pub fn pin(&self, gpio: u8) -> Option<&PinDefinition> {
        self.pins.iter().find(|p| p.gpio == gpio)
    }

    pub fn pins_with(&self, capability: PinCapability) -> impl Iterator<Item = &PinDefinition> {
        self.pins.iter().filter(move |p| p.has_capability(capability))
    }

    /// Label for a GPIO, falling back to `GPIO<n>` for pins not on the header.
    pub fn label_for(&self, gpio: u8) -> String {
        self.pin(gpio)
            .map(|p| p.label.clone())
            .unwrap_or_else(|| format!("GPIO{}", gpio))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_wire_format() {
        let json = serde_json::to_string(&PinCapability::DigitalIn).unwrap();
        assert_eq!(json, "\"digital-in\"");

        let cap: PinCapability = serde_json::from_str("\"analog-out\"").unwrap();
        assert_eq!(cap, PinCapability::AnalogOut);
    }

    #[test]
    fn test_capability_from_str_matches_display() {
        for cap in PinCapability::ALL {
            assert_eq!(cap.to_string().parse::<PinCapability>().unwrap(), cap);
        }
        assert!("digital".parse::<PinCapability>().is_err());
    }

    #[test]
    fn test_pin_defaults() {
        let pin: PinDefinition =
            serde_json::from_str(r#"{ "gpio": 4, "label": "D4", "capabilities": ["pwm"] }"#).unwrap();
        assert!(!pin.restricted);
        assert!(pin.restriction_reason.is_none());
        assert!(pin.has_capability(PinCapability::Pwm));
        assert!(!pin.has_capability(PinCapability::I2c));
    }
}
