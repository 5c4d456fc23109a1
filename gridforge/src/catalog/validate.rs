//! Load-time catalog checks
//!
//! A module fragment may only use placeholders that an addition can fill:
//! `ID` always, `FIELD` when a telemetry field is declared, and `PIN_i` for
//! every `i` below the module's pin arity.

use std::collections::HashSet;

use crate::catalog::schema::ModuleDefinition;
use crate::catalog::CatalogError;
use crate::generator::scaffold::SWITCH_COMMAND;
use crate::generator::template::{pin_placeholder, placeholders};
use crate::hardware::BoardDefinition;

pub const ID_PLACEHOLDER: &str = "ID";
pub const FIELD_PLACEHOLDER: &str = "FIELD";

/// Filled from the module's command levels, not from the instance.
const SWITCH_LEVEL_TOKENS: [&str; 2] = ["ON", "OFF"];

/// Placeholder names an instance of `def` will have values for.
pub fn declared_placeholders(def: &ModuleDefinition) -> Vec<String> {
    let mut declared = vec![ID_PLACEHOLDER.to_string()];
    if def.telemetry_field.is_some() {
        declared.push(FIELD_PLACEHOLDER.to_string());
    }
    declared.extend((0..def.pin_arity()).map(pin_placeholder));
    declared
}

pub fn validate_module(def: &ModuleDefinition) -> Result<(), CatalogError> {
    if def.id.trim().is_empty() {
        return Err(CatalogError::EmptyId { kind: "module" });
    }

    let declared = declared_placeholders(def);
    for (fragment, source) in def.fragments() {
        let undeclared: Vec<String> = placeholders(source)
            .into_iter()
            .filter(|name| !declared.iter().any(|d| d == name))
            .map(str::to_string)
            .collect();
        if !undeclared.is_empty() {
            return Err(CatalogError::InvalidTemplate {
                module: def.id.clone(),
                fragment: fragment.to_string(),
                tokens: undeclared,
            });
        }
    }

    // Command modules without their own body get the ON/OFF switch on PIN_0
    if def.is_command() && def.command.is_none() {
        let undeclared: Vec<String> = placeholders(SWITCH_COMMAND)
            .into_iter()
            .filter(|name| !SWITCH_LEVEL_TOKENS.contains(name))
            .filter(|name| !declared.iter().any(|d| d == name))
            .map(str::to_string)
            .collect();
        if !undeclared.is_empty() {
            return Err(CatalogError::InvalidTemplate {
                module: def.id.clone(),
                fragment: "command".to_string(),
                tokens: undeclared,
            });
        }
    }

    // Include lines are copied verbatim and must not carry tokens
    for include in &def.includes {
        if !placeholders(include).is_empty() {
            return Err(CatalogError::InvalidTemplate {
                module: def.id.clone(),
                fragment: "includes".to_string(),
                tokens: placeholders(include).into_iter().map(str::to_string).collect(),
            });
        }
    }

    Ok(())
}

pub fn validate_board(board: &BoardDefinition) -> Result<(), CatalogError> {
    if board.id.trim().is_empty() {
        return Err(CatalogError::EmptyId { kind: "board" });
    }

    let mut seen = HashSet::new();
    for pin in &board.pins {
        if !seen.insert(pin.gpio) {
            return Err(CatalogError::DuplicateId {
                kind: "pin",
                id: format!("{}:GPIO{}", board.id, pin.gpio),
            });
        }
    }

    for gpio in [board.default_i2c.sda, board.default_i2c.scl] {
        if board.pin(gpio).is_none() {
            return Err(CatalogError::InvalidBusPin {
                board: board.id.clone(),
                bus: "i2c",
                gpio,
            });
        }
    }

    Ok(())
}
