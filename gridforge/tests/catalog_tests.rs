//! Integration tests for catalog loading and user module overrides

use std::fs;

use gridforge::catalog::builtin::load_modules_from_directory;
use gridforge::prelude::*;
use gridforge::{CatalogError, ModuleCategory, ModuleDefinition};

const USER_RELAY: &str = r#"{
  "id": "relay-1ch",
  "name": "Relay (active high)",
  "description": "Relay board driven high to switch on.",
  "category": "actuator",
  "requires": ["digital-out"],
  "power_consumption_ma": 65.0,
  "constructor": "const int relayPin_{{ID}} = {{PIN_0}};",
  "setup": "pinMode(relayPin_{{ID}}, OUTPUT);",
  "topic_type": "command",
  "command_on": "HIGH",
  "command_off": "LOW"
}"#;

const BROKEN_TEMPLATE: &str = r#"{
  "id": "fan-pwm",
  "name": "PWM Fan",
  "description": "Fan with a tach line.",
  "category": "actuator",
  "requires": ["pwm"],
  "power_consumption_ma": 120.0,
  "constructor": "const int fan_{{ID}} = {{PIN_0}}; const int tach_{{ID}} = {{PIN_1}};",
  "setup": "",
  "topic_type": "none"
}"#;

#[test]
fn test_builtin_catalog_contents() {
    let catalog = Catalog::builtin().unwrap();

    assert_eq!(catalog.boards().len(), 2);
    assert_eq!(catalog.default_board().id, "esp32-devkit-v1");
    assert!(catalog.module("dht22").is_some());
    assert!(catalog.library("pubsubclient").is_some());
    assert!(catalog.library("arduinojson").is_some());

    // every library a module names resolves
    for def in catalog.modules() {
        for lib in &def.libraries {
            assert!(
                catalog.library(lib).is_some(),
                "{} names unknown library {}",
                def.id,
                lib
            );
        }
    }
}

#[test]
fn test_modules_in_category() {
    let catalog = Catalog::builtin().unwrap();
    let displays: Vec<&str> = catalog
        .modules_in_category(ModuleCategory::Display)
        .iter()
        .map(|m| m.id.as_str())
        .collect();
    assert_eq!(displays.len(), 2);
    assert!(displays.contains(&"ssd1306-i2c"));
    assert!(displays.contains(&"lcd-1602-i2c"));
}

#[test]
fn test_user_module_overrides_builtin() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("relay.json"), USER_RELAY).unwrap();

    let mut catalog = Catalog::builtin().unwrap();
    let count = catalog.modules().len();
    let errors = catalog.load_user_modules(dir.path());

    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(catalog.modules().len(), count);
    assert_eq!(catalog.module("relay-1ch").unwrap().command_levels(), ("HIGH", "LOW"));

    let mut project = Project::with_default_board(&catalog);
    project.network = NetworkConfig::with_device_id("relay_node");
    project.add_module(&catalog, "relay-1ch").unwrap();
    let src = GridForgeCore::generate(&catalog, &project).unwrap().source;
    assert!(src.contains("if (msg == \"ON\") digitalWrite(32, HIGH);"));
}

#[test]
fn test_bad_user_files_reported_not_loaded() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a_fan.json"), BROKEN_TEMPLATE).unwrap();
    fs::write(dir.path().join("b_garbage.json"), "{ not json").unwrap();
    fs::write(dir.path().join("c_relay.json"), USER_RELAY).unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let (modules, errors) = load_modules_from_directory(dir.path());
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0].id, "relay-1ch");
    assert_eq!(errors.len(), 2);
    assert!(errors[0].contains("PIN_1"), "{}", errors[0]);
    assert!(errors[1].contains("b_garbage.json"), "{}", errors[1]);
}

#[test]
fn test_insert_module_rejects_undeclared_placeholder() {
    let mut catalog = Catalog::builtin().unwrap();
    let def: ModuleDefinition = serde_json::from_str(BROKEN_TEMPLATE).unwrap();

    match catalog.insert_module(def) {
        Err(CatalogError::InvalidTemplate {
            module,
            fragment,
            tokens,
        }) => {
            assert_eq!(module, "fan-pwm");
            assert_eq!(fragment, "constructor");
            assert_eq!(tokens, vec!["PIN_1".to_string()]);
        }
        other => panic!("expected InvalidTemplate, got {:?}", other),
    }
    assert!(catalog.module("fan-pwm").is_none());
}

#[test]
fn test_missing_directory_reported() {
    let dir = tempfile::tempdir().unwrap();
    let (modules, errors) = load_modules_from_directory(&dir.path().join("nope"));
    assert!(modules.is_empty());
    assert_eq!(errors.len(), 1);
}
