//! Arduino library dependency list for generated firmware.

use crate::catalog::{Catalog, LibraryDefinition};
use crate::project::AddedModule;

/// Needed by the MQTT scaffold regardless of modules.
pub const CORE_LIBRARIES: [&str; 2] = ["pubsubclient", "arduinojson"];

/// Core libraries plus every library declared by an included module,
/// deduplicated in first-seen order. Ids missing from the catalog are dropped.
pub fn resolve_dependencies(catalog: &Catalog, modules: &[AddedModule]) -> Vec<LibraryDefinition> {
    let module_libraries = modules
        .iter()
        .filter_map(|m| catalog.module(&m.definition_id))
        .flat_map(|def| def.libraries.iter().map(String::as_str));

    let mut seen: Vec<&str> = CORE_LIBRARIES.to_vec();
    for id in module_libraries {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }

    seen.into_iter()
        .filter_map(|id| match catalog.library(id) {
            Some(lib) => Some(lib.clone()),
            None => {
                tracing::debug!("Library '{}' not in catalog, skipping", id);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn instance(definition_id: &str) -> AddedModule {
        AddedModule {
            instance_id: Uuid::new_v4(),
            definition_id: definition_id.to_string(),
            allocated_pins: BTreeMap::new(),
        }
    }

    fn ids(libs: &[LibraryDefinition]) -> Vec<&str> {
        libs.iter().map(|l| l.id.as_str()).collect()
    }

    #[test]
    fn test_core_libraries_always_present() {
        let catalog = Catalog::builtin().unwrap();
        let libs = resolve_dependencies(&catalog, &[]);
        assert_eq!(ids(&libs), vec!["pubsubclient", "arduinojson"]);
    }

    #[test]
    fn test_shared_libraries_deduplicated() {
        let catalog = Catalog::builtin().unwrap();
        let modules = vec![instance("dht22"), instance("bme280"), instance("dht22"), instance("relay-1ch")];
        let libs = resolve_dependencies(&catalog, &modules);
        assert_eq!(
            ids(&libs),
            vec!["pubsubclient", "arduinojson", "dht", "adafruit_sensor", "bme280"]
        );
    }

    #[test]
    fn test_unknown_ids_dropped() {
        let mut catalog = Catalog::builtin().unwrap();
        let mut def = catalog.module("relay-1ch").unwrap().clone();
        def.id = "smart-relay".to_string();
        def.libraries = vec!["not-a-library".to_string(), "onewire".to_string()];
        catalog.insert_module(def).unwrap();

        let libs = resolve_dependencies(&catalog, &[instance("smart-relay"), instance("ghost")]);
        assert_eq!(ids(&libs), vec!["pubsubclient", "arduinojson", "onewire"]);
    }
}
