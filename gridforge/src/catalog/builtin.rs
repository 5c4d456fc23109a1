//! Built-in and External Catalog Entries
//!
//! Board, module and library definitions are JSON documents compiled into
//! the binary. Users can add or override module definitions by placing JSON
//! files in a directory and loading it at runtime.

use std::path::Path;

use crate::catalog::schema::{LibraryDefinition, ModuleDefinition};
use crate::catalog::validate::validate_module;
use crate::catalog::CatalogError;
use crate::hardware::BoardDefinition;

const EMBEDDED_ESP32_DEVKIT: &str = include_str!("../../catalog/boards/esp32-devkit-v1.json");
const EMBEDDED_ESP8266_NODEMCU: &str = include_str!("../../catalog/boards/esp8266-nodemcu.json");

const EMBEDDED_MODULES: [(&str, &str); 17] = [
    ("dht22", include_str!("../../catalog/modules/dht22.json")),
    ("ds18b20", include_str!("../../catalog/modules/ds18b20.json")),
    ("bme280", include_str!("../../catalog/modules/bme280.json")),
    ("ldr", include_str!("../../catalog/modules/ldr.json")),
    ("soil-moisture", include_str!("../../catalog/modules/soil-moisture.json")),
    ("pir-hc-sr501", include_str!("../../catalog/modules/pir-hc-sr501.json")),
    ("hc-sr04", include_str!("../../catalog/modules/hc-sr04.json")),
    ("mag-switch", include_str!("../../catalog/modules/mag-switch.json")),
    ("rain-sensor", include_str!("../../catalog/modules/rain-sensor.json")),
    ("relay-1ch", include_str!("../../catalog/modules/relay-1ch.json")),
    ("servo-sg90", include_str!("../../catalog/modules/servo-sg90.json")),
    ("active-buzzer", include_str!("../../catalog/modules/active-buzzer.json")),
    ("ssd1306-i2c", include_str!("../../catalog/modules/ssd1306-i2c.json")),
    ("lcd-1602-i2c", include_str!("../../catalog/modules/lcd-1602-i2c.json")),
    ("pzem-004t", include_str!("../../catalog/modules/pzem-004t.json")),
    ("voltage-sensor", include_str!("../../catalog/modules/voltage-sensor.json")),
    ("rfid-rc522", include_str!("../../catalog/modules/rfid-rc522.json")),
];

const EMBEDDED_LIBRARIES: &str = include_str!("../../catalog/libraries.json");

fn parse<T: serde::de::DeserializeOwned>(origin: &str, json: &str) -> Result<T, CatalogError> {
    serde_json::from_str(json).map_err(|e| CatalogError::Parse {
        origin: origin.to_string(),
        message: e.to_string(),
    })
}

pub fn builtin_boards() -> Result<Vec<BoardDefinition>, CatalogError> {
    Ok(vec![
        parse("esp32-devkit-v1.json", EMBEDDED_ESP32_DEVKIT)?,
        parse("esp8266-nodemcu.json", EMBEDDED_ESP8266_NODEMCU)?,
    ])
}

pub fn builtin_modules() -> Result<Vec<ModuleDefinition>, CatalogError> {
    EMBEDDED_MODULES
        .iter()
        .map(|(name, json)| parse(&format!("{}.json", name), json))
        .collect()
}

pub fn builtin_libraries() -> Result<Vec<LibraryDefinition>, CatalogError> {
    parse("libraries.json", EMBEDDED_LIBRARIES)
}

/// Load module definitions from a directory of JSON files.
/// Returns both successfully loaded definitions and any errors encountered.
pub fn load_modules_from_directory(dir: &Path) -> (Vec<ModuleDefinition>, Vec<String>) {
    let mut modules = Vec::new();
    let mut errors = Vec::new();

    if !dir.is_dir() {
        errors.push(format!("{:?} is not a directory", dir));
        return (modules, errors);
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            errors.push(format!("Failed to read directory {:?}: {}", dir, e));
            return (modules, errors);
        }
    };

    let mut paths: Vec<_> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().map(|e| e == "json").unwrap_or(false))
        .collect();
    // read_dir order is platform dependent
    paths.sort();

    for path in paths {
        match load_module_from_file(&path) {
            Ok(def) => {
                tracing::info!("Loaded module '{}' from {:?}", def.id, path.file_name());
                modules.push(def);
            }
            Err(e) => {
                let error_msg = format!("Failed to load {:?}: {}", path.file_name(), e);
                tracing::warn!("{}", error_msg);
                errors.push(error_msg);
            }
        }
    }

    (modules, errors)
}

/// Load and validate a single module definition file.
pub fn load_module_from_file(path: &Path) -> Result<ModuleDefinition, CatalogError> {
    let content = std::fs::read_to_string(path)?;
    let origin = path.display().to_string();
    let def: ModuleDefinition = parse(&origin, &content)?;
    validate_module(&def)?;
    Ok(def)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::validate::validate_board;
    use std::io::Write;

    #[test]
    fn test_embedded_modules_parse_and_validate() {
        let modules = builtin_modules().unwrap();
        assert_eq!(modules.len(), 17);

        for (def, (name, _)) in modules.iter().zip(EMBEDDED_MODULES.iter()) {
            assert_eq!(&def.id, name, "file name should match module id");
            validate_module(def).unwrap();
        }
    }

    #[test]
    fn test_embedded_boards() {
        let boards = builtin_boards().unwrap();
        assert_eq!(boards.len(), 2);
        for board in &boards {
            validate_board(board).unwrap();
        }

        let esp32 = &boards[0];
        assert_eq!(esp32.id, "esp32-devkit-v1");
        assert_eq!(esp32.pins.len(), 24);
        assert_eq!((esp32.default_i2c.sda, esp32.default_i2c.scl), (21, 22));
    }

    #[test]
    fn test_embedded_libraries() {
        let libraries = builtin_libraries().unwrap();
        assert!(libraries.iter().any(|l| l.id == "pubsubclient"));
        assert!(libraries.iter().any(|l| l.id == "arduinojson"));

        // every library a built-in module names is resolvable
        for def in builtin_modules().unwrap() {
            for lib in &def.libraries {
                assert!(
                    libraries.iter().any(|l| &l.id == lib),
                    "{} references unknown library {}",
                    def.id,
                    lib
                );
            }
        }
    }

    #[test]
    fn test_load_modules_from_directory() {
        let dir = tempfile::tempdir().unwrap();

        let mut good = std::fs::File::create(dir.path().join("a_flow.json")).unwrap();
        write!(
            good,
            r#"{{
                "id": "flow-meter",
                "name": "Flow Meter",
                "category": "environmental",
                "requires": ["digital-in"],
                "constructor": "volatile long pulses_{{{{ID}}}} = 0;",
                "setup": "pinMode({{{{PIN_0}}}}, INPUT_PULLUP);"
            }}"#
        )
        .unwrap();

        let mut bad = std::fs::File::create(dir.path().join("b_broken.json")).unwrap();
        write!(
            bad,
            r#"{{
                "id": "broken",
                "name": "Broken",
                "category": "power",
                "requires": [],
                "constructor": "int x = {{{{PIN_0}}}};"
            }}"#
        )
        .unwrap();

        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let (modules, errors) = load_modules_from_directory(dir.path());
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].id, "flow-meter");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("b_broken.json"));
    }

    #[test]
    fn test_load_from_missing_directory() {
        let (modules, errors) = load_modules_from_directory(Path::new("/definitely/not/here"));
        assert!(modules.is_empty());
        assert_eq!(errors.len(), 1);
    }
}
