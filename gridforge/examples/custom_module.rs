//! Example: register a user-defined module and wire it next to a built-in one.
//! Run with: cargo run --example custom_module

use gridforge::{Catalog, GridForgeCore, GridForgeError, ModuleDefinition};

const WATER_LEVEL: &str = r#"{
  "id": "water-level",
  "name": "Float Switch",
  "description": "Tank float switch, closed when full.",
  "category": "environmental",
  "requires": ["digital-in"],
  "constructor": "const int floatPin_{{ID}} = {{PIN_0}};",
  "setup": "pinMode(floatPin_{{ID}}, INPUT_PULLUP);",
  "topic_type": "telemetry",
  "telemetry_field": "tank_full",
  "telemetry_read": "    sendTelemetry(\"{{FIELD}}\", digitalRead(floatPin_{{ID}}) == LOW);"
}"#;

fn main() -> Result<(), GridForgeError> {
    let mut catalog = Catalog::builtin()?;
    let def: ModuleDefinition = serde_json::from_str(WATER_LEVEL)?;
    catalog.insert_module(def)?;

    let project = GridForgeCore::plan(&catalog, "esp8266-nodemcu", &["water-level", "relay-1ch"])?;
    let firmware = GridForgeCore::generate(&catalog, &project)?;

    for module in project.modules() {
        println!("{} -> {:?}", module.definition_id, module.allocated_pins);
    }
    println!("{} ({} bytes)", firmware.filename, firmware.source.len());
    for lib in &firmware.libraries {
        println!("  needs {}", lib.manager_name);
    }
    Ok(())
}
