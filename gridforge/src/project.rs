//! Project state and module addition
//!
//! A [`Project`] is the single source of truth: the active board, the
//! committed module list, and the network settings. Adding a module rebuilds
//! a throwaway [`PinAllocator`] from the committed list, asks it for pins,
//! and only on full success replaces the list with one that includes the new
//! instance. A failed addition leaves the project exactly as it was.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{Catalog, ModuleDefinition};
use crate::config::NetworkConfig;
use crate::generator::template::pin_placeholder;
use crate::hardware::{BoardDefinition, BusType, PinAllocator, PinCapability};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    #[error("Not enough '{capability}' pins available for module '{module}'")]
    Exhausted {
        module: String,
        capability: PinCapability,
    },
    #[error("{bus} bus pins unavailable for module '{module}'")]
    BusUnavailable { module: String, bus: BusType },
    #[error("Module definition '{0}' not found")]
    UnknownModule(String),
}

/// A module wired to the board. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddedModule {
    pub instance_id: Uuid,
    /// Catalog id of the module definition
    pub definition_id: String,
    /// `PIN_i` placeholder → GPIO
    pub allocated_pins: BTreeMap<String, u8>,
}

impl AddedModule {
    /// Short identifier used to keep generated symbol names unique.
    pub fn short_id(&self) -> String {
        short_id(&self.instance_id)
    }

    pub fn pin(&self, index: usize) -> Option<u8> {
        self.allocated_pins.get(&pin_placeholder(index)).copied()
    }
}

/// First hyphen-separated group of the hyphenated UUID.
pub fn short_id(id: &Uuid) -> String {
    let hyphenated = id.hyphenated().to_string();
    hyphenated
        .split('-')
        .next()
        .unwrap_or(&hyphenated)
        .to_string()
}

/// Fresh allocator holding every pin recorded by `modules`.
///
/// Bus pins recorded by several instances conflict on replay; the first
/// holder keeps the row and the rest are skipped.
pub fn replay<'a>(board: &'a BoardDefinition, modules: &[AddedModule]) -> PinAllocator<'a> {
    let mut allocator = PinAllocator::new(board);
    for module in modules {
        for (placeholder, gpio) in &module.allocated_pins {
            if let Err(e) = allocator.reserve_pin(*gpio, module.instance_id, placeholder) {
                tracing::debug!("Replay of {} {}: {}", module.definition_id, placeholder, e);
            }
        }
    }
    allocator
}

/// Assign pins for one new instance of `def` on an existing allocator.
pub fn assign_pins(
    allocator: &mut PinAllocator<'_>,
    instance_id: Uuid,
    def: &ModuleDefinition,
) -> Result<AddedModule, AllocationError> {
    let mut allocated_pins = BTreeMap::new();

    if def.bus == Some(BusType::I2c) {
        let pins = allocator
            .shared_bus(BusType::I2c)
            .ok_or_else(|| AllocationError::BusUnavailable {
                module: def.id.clone(),
                bus: BusType::I2c,
            })?;
        for (index, gpio) in pins.into_iter().enumerate() {
            // Another instance already holding the pin is the shared bus
            if let Err(e) = allocator.reserve_pin(gpio, instance_id, BusType::I2c.as_str()) {
                tracing::debug!("Sharing i2c bus pin for {}: {}", def.id, e);
            }
            allocated_pins.insert(pin_placeholder(index), gpio);
        }
    } else {
        for (index, capability) in def.requires.iter().enumerate() {
            let gpio = allocator.allocate(instance_id, *capability, true).ok_or_else(|| {
                AllocationError::Exhausted {
                    module: def.id.clone(),
                    capability: *capability,
                }
            })?;
            allocated_pins.insert(pin_placeholder(index), gpio);
        }
    }

    Ok(AddedModule {
        instance_id,
        definition_id: def.id.clone(),
        allocated_pins,
    })
}

/// Decide the pins for a new instance against the committed `modules`.
pub fn plan_addition(
    board: &BoardDefinition,
    modules: &[AddedModule],
    def: &ModuleDefinition,
    instance_id: Uuid,
) -> Result<AddedModule, AllocationError> {
    let mut allocator = replay(board, modules);
    assign_pins(&mut allocator, instance_id, def)
}

/// Allocate an ordered list of instances in a single allocator pass.
pub fn allocate_batch(
    board: &BoardDefinition,
    requests: &[(Uuid, &ModuleDefinition)],
) -> Result<Vec<AddedModule>, AllocationError> {
    let mut allocator = PinAllocator::new(board);
    requests
        .iter()
        .map(|(id, def)| assign_pins(&mut allocator, *id, def))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct Project {
    board: BoardDefinition,
    modules: Vec<AddedModule>,
    pub network: NetworkConfig,
    /// Signed identity token; the sentinel is used when absent
    pub identity: Option<String>,
}

impl Project {
    pub fn new(board: BoardDefinition) -> Self {
        Self {
            board,
            modules: Vec::new(),
            network: NetworkConfig::default(),
            identity: None,
        }
    }

    /// Empty project on the catalog's default board.
    pub fn with_default_board(catalog: &Catalog) -> Self {
        Self::new(catalog.default_board().clone())
    }

    pub fn board(&self) -> &BoardDefinition {
        &self.board
    }

    pub fn modules(&self) -> &[AddedModule] {
        &self.modules
    }

    pub fn module(&self, instance_id: Uuid) -> Option<&AddedModule> {
        self.modules.iter().find(|m| m.instance_id == instance_id)
    }

    /// Switch boards. Existing allocations are meaningless on another pin
    /// layout, so the module list is discarded.
    pub fn set_board(&mut self, catalog: &Catalog, board_id: &str) {
        let board = catalog.board_or_default(board_id).clone();
        if !self.modules.is_empty() {
            tracing::info!(
                "Switching board {} -> {}, dropping {} module(s)",
                self.board.id,
                board.id,
                self.modules.len()
            );
        }
        self.board = board;
        self.modules = Vec::new();
    }

    pub fn add_module(
        &mut self,
        catalog: &Catalog,
        definition_id: &str,
    ) -> Result<AddedModule, AllocationError> {
        self.add_module_with_id(catalog, definition_id, Uuid::new_v4())
    }

    /// Add a module under a caller-chosen instance id.
    pub fn add_module_with_id(
        &mut self,
        catalog: &Catalog,
        definition_id: &str,
        instance_id: Uuid,
    ) -> Result<AddedModule, AllocationError> {
        let def = catalog
            .module(definition_id)
            .ok_or_else(|| AllocationError::UnknownModule(definition_id.to_string()))?;

        let added = plan_addition(&self.board, &self.modules, def, instance_id)?;
        tracing::info!(
            "Added {} ({}) on {:?}",
            def.id,
            added.short_id(),
            added.allocated_pins
        );

        self.modules = self
            .modules
            .iter()
            .cloned()
            .chain(std::iter::once(added.clone()))
            .collect();
        Ok(added)
    }

    /// Remove an instance. Returns `false` when no such instance exists.
    pub fn remove_module(&mut self, instance_id: Uuid) -> bool {
        let before = self.modules.len();
        self.modules = self
            .modules
            .iter()
            .filter(|m| m.instance_id != instance_id)
            .cloned()
            .collect();
        self.modules.len() != before
    }

    /// Allocator rebuilt from the committed module list.
    pub fn allocator(&self) -> PinAllocator<'_> {
        replay(&self.board, &self.modules)
    }

    /// Sum of declared module draw in mA; unknown definitions count as zero.
    pub fn estimated_current_ma(&self, catalog: &Catalog) -> f32 {
        self.modules
            .iter()
            .filter_map(|m| catalog.module(&m.definition_id))
            .map(|def| def.power_consumption_ma)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::builtin().unwrap()
    }

    #[test]
    fn test_short_id() {
        let id = Uuid::parse_str("3f2a9c1b-0000-4000-8000-000000000000").unwrap();
        assert_eq!(short_id(&id), "3f2a9c1b");
    }

    #[test]
    fn test_add_records_pins_in_requirement_order() {
        let catalog = catalog();
        let mut project = Project::with_default_board(&catalog);

        let added = project.add_module(&catalog, "hc-sr04").unwrap();
        // trig: first unrestricted digital-out, echo: next unrestricted digital-in
        assert_eq!(added.pin(0), Some(32));
        assert_eq!(added.pin(1), Some(33));
        assert_eq!(project.modules().len(), 1);
    }

    #[test]
    fn test_unknown_module_is_noop() {
        let catalog = catalog();
        let mut project = Project::with_default_board(&catalog);
        project.add_module(&catalog, "relay-1ch").unwrap();

        let err = project.add_module(&catalog, "flux-capacitor").unwrap_err();
        assert_eq!(err, AllocationError::UnknownModule("flux-capacitor".to_string()));
        assert_eq!(project.modules().len(), 1);
    }

    #[test]
    fn test_remove_module() {
        let catalog = catalog();
        let mut project = Project::with_default_board(&catalog);
        let first = project.add_module(&catalog, "relay-1ch").unwrap();
        let second = project.add_module(&catalog, "active-buzzer").unwrap();

        assert!(project.remove_module(first.instance_id));
        assert!(!project.remove_module(first.instance_id));
        assert_eq!(project.modules(), &[second]);

        // The freed pin is handed out again
        let again = project.add_module(&catalog, "relay-1ch").unwrap();
        assert_eq!(again.pin(0), first.pin(0));
    }

    #[test]
    fn test_set_board_discards_modules() {
        let catalog = catalog();
        let mut project = Project::with_default_board(&catalog);
        project.add_module(&catalog, "dht22").unwrap();

        project.set_board(&catalog, "esp8266-nodemcu");
        assert_eq!(project.board().id, "esp8266-nodemcu");
        assert!(project.modules().is_empty());

        project.set_board(&catalog, "no-such-board");
        assert_eq!(project.board().id, "esp32-devkit-v1");
    }

    #[test]
    fn test_allocator_replays_committed_pins() {
        let catalog = catalog();
        let mut project = Project::with_default_board(&catalog);
        let relay = project.add_module(&catalog, "relay-1ch").unwrap();

        let allocator = project.allocator();
        let gpio = relay.pin(0).unwrap();
        let reservation = allocator.reservation(gpio).unwrap();
        assert_eq!(reservation.owner, relay.instance_id);
        assert_eq!(reservation.function, "PIN_0");
    }

    #[test]
    fn test_estimated_current() {
        let catalog = catalog();
        let mut project = Project::with_default_board(&catalog);
        project.add_module(&catalog, "relay-1ch").unwrap();
        project.add_module(&catalog, "dht22").unwrap();
        assert!((project.estimated_current_ma(&catalog) - 72.0).abs() < f32::EPSILON);
    }
}
