//! Arduino firmware generation: placeholder templates, the fixed MQTT
//! scaffold, the synthesizer, and library dependency resolution.

pub mod dependencies;
pub mod firmware;
pub mod scaffold;
pub mod template;

pub use dependencies::{resolve_dependencies, CORE_LIBRARIES};
pub use firmware::{
    suggested_filename, FirmwareGenerator, GeneratedFirmware, RenderError, FIRMWARE_VERSION,
    PROTOCOL_SIGNATURE, RECONNECT_INTERVAL_MS, TELEMETRY_INTERVAL_MS,
};
pub use template::{placeholders, render, Substitutions};
