//! Module and Library Catalog Schema
//!
//! Data structures for peripheral module definitions and the third-party
//! Arduino libraries they depend on. Definitions are immutable catalog
//! entries; fragments carry `{{TOKEN}}` placeholders resolved at synthesis.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hardware::{BusType, PinCapability};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleCategory {
    Environmental,
    Security,
    Actuator,
    Power,
    Identity,
    Display,
}

impl ModuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleCategory::Environmental => "environmental",
            ModuleCategory::Security => "security",
            ModuleCategory::Actuator => "actuator",
            ModuleCategory::Power => "power",
            ModuleCategory::Identity => "identity",
            ModuleCategory::Display => "display",
        }
    }
}

impl fmt::Display for ModuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a module publishes data, receives commands, or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicType {
    Telemetry,
    Command,
    #[default]
    None,
}

/// A peripheral module that can be wired to a board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDefinition {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    pub category: ModuleCategory,

    /// One entry per pin the module needs, in `PIN_0`, `PIN_1`, ... order
    pub requires: Vec<PinCapability>,

    /// Fixed bus the module sits on. Only I2C is shared between instances.
    #[serde(default)]
    pub bus: Option<BusType>,

    /// Typical draw in mA
    #[serde(default)]
    pub power_consumption_ma: f32,

    /// Header include lines, e.g. `#include <OneWire.h>`
    #[serde(default)]
    pub includes: Vec<String>,

    /// Global declaration fragment
    pub constructor: String,

    /// Statement(s) placed in `setup()`
    #[serde(default)]
    pub setup: String,

    /// Statement(s) placed in `loop()` on every iteration
    #[serde(default, rename = "loop")]
    pub loop_code: Option<String>,

    #[serde(default)]
    pub topic_type: TopicType,

    /// Telemetry key, also accepted as a command topic suffix
    #[serde(default)]
    pub telemetry_field: Option<String>,

    /// Statement(s) reading the sensor and calling `sendTelemetry`
    #[serde(default)]
    pub telemetry_read: Option<String>,

    /// Custom command handler body; `msg` holds the payload text
    #[serde(default)]
    pub command: Option<String>,

    #[serde(default)]
    pub command_on: Option<String>,

    #[serde(default)]
    pub command_off: Option<String>,

    /// Library ids resolved through the library catalog
    #[serde(default)]
    pub libraries: Vec<String>,
}

impl ModuleDefinition {
    /// Number of `PIN_i` placeholders an addition assigns.
    pub fn pin_arity(&self) -> usize {
        match self.bus {
            Some(BusType::I2c) => 2,
            _ => self.requires.len(),
        }
    }

    pub fn is_telemetry(&self) -> bool {
        self.topic_type == TopicType::Telemetry
            && self.telemetry_field.is_some()
            && self.telemetry_read.is_some()
    }

    pub fn is_command(&self) -> bool {
        self.topic_type == TopicType::Command
    }

    pub fn command_levels(&self) -> (&str, &str) {
        (
            self.command_on.as_deref().unwrap_or("HIGH"),
            self.command_off.as_deref().unwrap_or("LOW"),
        )
    }

    /// Every source fragment with a short name, for validation and rendering.
    pub fn fragments(&self) -> Vec<(&'static str, &str)> {
        let mut fragments = vec![("constructor", self.constructor.as_str()), ("setup", self.setup.as_str())];
        if let Some(ref code) = self.loop_code {
            fragments.push(("loop", code.as_str()));
        }
        if let Some(ref code) = self.telemetry_read {
            fragments.push(("telemetry_read", code.as_str()));
        }
        if let Some(ref code) = self.command {
            fragments.push(("command", code.as_str()));
        }
        fragments
    }
}

/// Arduino library metadata for the dependency list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub author: String,
    /// Name to search for in the Arduino Library Manager
    pub manager_name: String,
    #[serde(default)]
    pub url: Option<String>,
}
