//! GridForge - pin allocation and MQTT firmware generation for ESP boards
//!
//! This library wires catalog peripheral modules onto ESP32/ESP8266 boards,
//! picking GPIOs that satisfy each module's capability needs, and generates a
//! complete Arduino sketch that joins WiFi, talks to an MQTT broker and
//! publishes telemetry or accepts commands for every attached module.
//!
//! # Quick Start
//!
//! ```no_run
//! use gridforge::{Catalog, GridForgeCore};
//!
//! let catalog = Catalog::builtin().unwrap();
//! let mut project =
//!     GridForgeCore::plan(&catalog, "esp32-devkit-v1", &["dht22", "relay-1ch"]).unwrap();
//! project.network.ssid = "greenhouse".into();
//!
//! let firmware = GridForgeCore::generate(&catalog, &project).unwrap();
//! println!("{}", firmware.filename);
//! ```
//!
//! # Features
//!
//! - **Pin allocation**: capability matching with restricted pins used last
//! - **Shared buses**: I2C modules share the board's default SDA/SCL
//! - **Firmware generation**: deterministic sketch with discovery, telemetry and commands
//! - **Catalog validation**: module templates checked for unresolvable placeholders on load

pub mod catalog;
pub mod config;
pub mod core;
pub mod generator;
pub mod hardware;
pub mod identity;
pub mod project;

// Re-export main types
pub use catalog::{Catalog, CatalogError, LibraryDefinition, ModuleCategory, ModuleDefinition};
pub use config::NetworkConfig;
pub use crate::core::{GridForgeCore, GridForgeError, PinAssignment, PlanReport, PlannedModule};
pub use generator::{FirmwareGenerator, GeneratedFirmware, RenderError};
pub use hardware::{BoardDefinition, BusType, PinAllocator, PinCapability, ReservationError};
pub use identity::{IdentityData, IdentityIssuer, LocalSigner, UNREGISTERED_IDENTITY};
pub use project::{AddedModule, AllocationError, Project};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        AddedModule, Catalog, GeneratedFirmware, GridForgeCore, GridForgeError, NetworkConfig,
        PinCapability, Project,
    };
}
