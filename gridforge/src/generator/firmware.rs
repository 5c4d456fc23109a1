//! Firmware synthesis
//!
//! Renders a board, an ordered module list, the network settings and an
//! identity token into a single Arduino sketch. Output is a pure function of
//! those inputs: the same inputs always produce byte-identical text.
//!
//! Sections are collected in one pass over the module list and assembled in
//! a fixed order: banner, includes, credentials, globals, protocol helpers,
//! `setup()`, `loop()`.

use serde::Serialize;

use crate::catalog::validate::{FIELD_PLACEHOLDER, ID_PLACEHOLDER};
use crate::catalog::{Catalog, LibraryDefinition, ModuleDefinition};
use crate::config::NetworkConfig;
use crate::generator::dependencies::resolve_dependencies;
use crate::generator::scaffold;
use crate::generator::template::{render, Substitutions};
use crate::hardware::{BoardDefinition, McuFamily};
use crate::identity::UNREGISTERED_IDENTITY;
use crate::project::{AddedModule, Project};

pub const PROTOCOL_SIGNATURE: &str = "GRIDS-IOT-V1";
pub const FIRMWARE_VERSION: &str = "1.0.0";
pub const TELEMETRY_INTERVAL_MS: u32 = 5000;
pub const RECONNECT_INTERVAL_MS: u32 = 5000;

/// Command topic suffix accepted for modules without a telemetry field.
const DEFAULT_COMMAND_SUFFIX: &str = "switch";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("Module '{module}' ({instance}) fragment '{fragment}' has unresolved placeholder(s): {}", .tokens.join(", "))]
    UnresolvedPlaceholders {
        module: String,
        instance: String,
        fragment: String,
        tokens: Vec<String>,
    },
    #[error("Scaffold section '{section}' has unresolved placeholder(s): {}", .tokens.join(", "))]
    Scaffold {
        section: &'static str,
        tokens: Vec<String>,
    },
}

/// Sketch text plus what a user needs to build it.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedFirmware {
    pub source: String,
    pub filename: String,
    pub libraries: Vec<LibraryDefinition>,
}

/// Insertion-ordered list without duplicates.
#[derive(Debug, Default)]
struct OrderedSet(Vec<String>);

impl OrderedSet {
    fn insert(&mut self, value: impl Into<String>) {
        let value = value.into();
        if !self.0.contains(&value) {
            self.0.push(value);
        }
    }

    fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

#[derive(Debug, Default)]
struct Sections {
    includes: OrderedSet,
    globals: OrderedSet,
    setups: Vec<String>,
    loops: Vec<String>,
    discovery: Vec<String>,
    commands: Vec<String>,
}

pub struct FirmwareGenerator<'a> {
    catalog: &'a Catalog,
}

impl<'a> FirmwareGenerator<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn generate_project(&self, project: &Project) -> Result<GeneratedFirmware, RenderError> {
        self.generate(
            project.board(),
            project.modules(),
            &project.network,
            project.identity.as_deref(),
        )
    }

    pub fn generate(
        &self,
        board: &BoardDefinition,
        modules: &[AddedModule],
        network: &NetworkConfig,
        identity: Option<&str>,
    ) -> Result<GeneratedFirmware, RenderError> {
        let source = self.render_source(board, modules, network, identity)?;
        Ok(GeneratedFirmware {
            source,
            filename: suggested_filename(&network.device_id),
            libraries: resolve_dependencies(self.catalog, modules),
        })
    }

    /// Render the sketch text only.
    pub fn render_source(
        &self,
        board: &BoardDefinition,
        modules: &[AddedModule],
        network: &NetworkConfig,
        identity: Option<&str>,
    ) -> Result<String, RenderError> {
        let identity = identity
            .filter(|token| !token.is_empty())
            .unwrap_or(UNREGISTERED_IDENTITY);

        let mut sections = Sections::default();

        for include in scaffold::CORE_INCLUDES {
            sections.includes.insert(include);
        }
        let mcu_includes = match board.mcu {
            McuFamily::Esp32 => scaffold::ESP32_INCLUDES,
            McuFamily::Esp8266 => scaffold::ESP8266_INCLUDES,
        };
        for include in mcu_includes {
            sections.includes.insert(include);
        }

        sections.globals.insert("WiFiClient espClient;");
        sections.globals.insert("PubSubClient client(espClient);");
        sections
            .globals
            .insert(format!("const char* mqtt_server = {};", c_string(&network.broker)));
        sections
            .globals
            .insert(format!("const int mqtt_port = {};", network.port));
        sections
            .globals
            .insert(format!("const char* device_id = {};", c_string(&network.device_id)));
        sections.globals.insert(format!(
            "const char* ghost_identity = {}; // Signed Identity",
            c_string(identity)
        ));

        for instance in modules {
            match self.catalog.module(&instance.definition_id) {
                Some(def) => add_module(&mut sections, instance, def)?,
                None => tracing::warn!(
                    "Skipping {} ({}): definition not in catalog",
                    instance.definition_id,
                    instance.short_id()
                ),
            }
        }

        assemble(board, network, &sections)
    }
}

fn add_module(
    sections: &mut Sections,
    instance: &AddedModule,
    def: &ModuleDefinition,
) -> Result<(), RenderError> {
    let short_id = instance.short_id();
    sections.discovery.push(def.id.clone());

    for include in &def.includes {
        let include = include.trim();
        if !include.is_empty() {
            sections.includes.insert(include);
        }
    }

    let mut subs = Substitutions::new().with(ID_PLACEHOLDER, &short_id);
    if let Some(ref field) = def.telemetry_field {
        subs.insert(FIELD_PLACEHOLDER, field);
    }
    for (placeholder, gpio) in &instance.allocated_pins {
        subs.insert(placeholder.clone(), gpio);
    }

    let fragment = |name: &str, source: &str| -> Result<String, RenderError> {
        render(source, &subs).map_err(|tokens| RenderError::UnresolvedPlaceholders {
            module: def.id.clone(),
            instance: short_id.clone(),
            fragment: name.to_string(),
            tokens,
        })
    };

    sections.globals.insert(fragment("constructor", &def.constructor)?);

    if !def.setup.trim().is_empty() {
        let setup = fragment("setup", &def.setup)?;
        sections
            .setups
            .push(format!("  // Setup {}\n{}", def.name, indent(&setup, 2)));
    }

    if let Some(ref code) = def.loop_code {
        let code = fragment("loop", code)?;
        sections
            .loops
            .push(format!("  // Loop {}\n{}", def.name, indent(&code, 2)));
    }

    if def.is_telemetry() {
        if let Some(ref read) = def.telemetry_read {
            let read = fragment("telemetry_read", read)?;
            sections.loops.push(format!(
                "  // Telemetry {name}\n  static unsigned long last_{id} = 0;\n  if (millis() - last_{id} > {interval}) {{\n{read}\n    last_{id} = millis();\n  }}",
                name = def.name,
                id = short_id,
                interval = TELEMETRY_INTERVAL_MS,
                read = read,
            ));
        }
    } else if def.telemetry_field.is_some() && def.telemetry_read.is_none() {
        tracing::debug!("{} declares telemetry but no read statement", def.id);
    }

    if def.is_command() {
        let body = match def.command {
            Some(ref code) => fragment("command", code)?,
            None => {
                let (on, off) = def.command_levels();
                let subs = subs.clone().with("ON", on).with("OFF", off);
                render(scaffold::SWITCH_COMMAND, &subs).map_err(|tokens| {
                    RenderError::UnresolvedPlaceholders {
                        module: def.id.clone(),
                        instance: short_id.clone(),
                        fragment: "command".to_string(),
                        tokens,
                    }
                })?
            }
        };
        let suffix = def
            .telemetry_field
            .as_deref()
            .unwrap_or(DEFAULT_COMMAND_SUFFIX);
        sections.commands.push(format!(
            "    if (mod == {} || mod == {}) {{\n{}\n{}\n    }}",
            c_string(&def.id),
            c_string(suffix),
            indent(&body, 6),
            indent(scaffold::COMMAND_ACK, 6),
        ));
    }

    Ok(())
}

fn assemble(
    board: &BoardDefinition,
    network: &NetworkConfig,
    sections: &Sections,
) -> Result<String, RenderError> {
    let scaffold_section = |section: &'static str, template: &str, subs: &Substitutions| {
        render(template, subs).map_err(|tokens| RenderError::Scaffold { section, tokens })
    };

    let discovery = if sections.discovery.is_empty() {
        "  // no modules".to_string()
    } else {
        sections
            .discovery
            .iter()
            .map(|id| format!("  mods.add({});", c_string(id)))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let commands = if sections.commands.is_empty() {
        "    // no command modules".to_string()
    } else {
        sections.commands.join("\n")
    };

    let helpers = scaffold_section(
        "helpers",
        scaffold::HELPERS,
        &Substitutions::new()
            .with("SIGNATURE", PROTOCOL_SIGNATURE)
            .with("BOARD", c_escape(&board.id))
            .with("VERSION", FIRMWARE_VERSION)
            .with("DISCOVERY_MODULES", discovery)
            .with("COMMAND_BRANCHES", commands),
    )?;
    let setup = scaffold_section(
        "setup",
        scaffold::SETUP,
        &Substitutions::new().with("MODULE_SETUP", sections.setups.join("\n")),
    )?;
    let main_loop = scaffold_section(
        "loop",
        scaffold::LOOP,
        &Substitutions::new()
            .with("RECONNECT_INTERVAL", RECONNECT_INTERVAL_MS)
            .with("MODULE_LOOP", sections.loops.join("\n")),
    )?;

    let mut lines: Vec<String> = Vec::new();
    lines.push(scaffold::BANNER.to_string());
    lines.push("#include <Arduino.h>".to_string());
    lines.extend(sections.includes.iter().cloned());
    lines.push(String::new());

    lines.push(format!("const char* ssid = {};", c_string(&network.ssid)));
    lines.push(format!("const char* password = {};", c_string(&network.password)));
    lines.push(String::new());

    lines.extend(sections.globals.iter().cloned());
    lines.push(String::new());

    lines.push(helpers);
    lines.push(setup);
    lines.push(main_loop);

    Ok(lines.join("\n"))
}

/// Escape text for use inside a C string literal.
pub fn c_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            // Octal, since `\x` escapes swallow any following hex digits
            c if c.is_ascii_control() => out.push_str(&format!("\\{:03o}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Quoted, escaped C string literal.
pub fn c_string(value: &str) -> String {
    format!("\"{}\"", c_escape(value))
}

fn indent(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Sketch file name derived from the device id.
pub fn suggested_filename(device_id: &str) -> String {
    let stem: String = device_id
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "firmware.ino".to_string()
    } else {
        format!("{}.ino", stem)
    }
}
