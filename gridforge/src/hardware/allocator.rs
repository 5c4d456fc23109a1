//! Pin Allocator
//!
//! Decides which physical pin satisfies a capability request against a
//! board's static pin table and a transient reservation table. An allocator
//! lives for a single addition attempt: it is rebuilt from the committed
//! module list each time and dropped afterwards.

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use crate::hardware::board::{BoardDefinition, BusType, PinCapability, PinDefinition};

/// A GPIO claimed by a module instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinReservation {
    pub gpio: u8,
    pub owner: Uuid,
    /// Placeholder name (`PIN_0`) on replay, capability tag on fresh allocation,
    /// bus name for shared bus pins.
    pub function: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReservationError {
    #[error("GPIO {gpio} is already reserved by {owner} as '{function}'")]
    Conflict {
        gpio: u8,
        owner: Uuid,
        function: String,
    },
    #[error("GPIO {gpio} does not exist on board '{board}'")]
    UnknownPin { gpio: u8, board: String },
}

pub struct PinAllocator<'a> {
    board: &'a BoardDefinition,
    reservations: BTreeMap<u8, PinReservation>,
}

impl<'a> PinAllocator<'a> {
    pub fn new(board: &'a BoardDefinition) -> Self {
        Self {
            board,
            reservations: BTreeMap::new(),
        }
    }

    pub fn board(&self) -> &'a BoardDefinition {
        self.board
    }

    /// Clear all reservations
    pub fn reset(&mut self) {
        self.reservations.clear();
    }

    /// Unreserved pins carrying `capability`, in board declaration order.
    pub fn available_pins(&self, capability: PinCapability) -> Vec<&'a PinDefinition> {
        self.board
            .pins
            .iter()
            .filter(|pin| !self.reservations.contains_key(&pin.gpio))
            .filter(|pin| pin.has_capability(capability))
            .collect()
    }

    /// Reserve a specific pin for a module instance.
    ///
    /// Re-reserving with the same owner and function is a no-op success; any
    /// other claim on an occupied GPIO is a conflict.
    pub fn reserve_pin(
        &mut self,
        gpio: u8,
        owner: Uuid,
        function: &str,
    ) -> Result<(), ReservationError> {
        if let Some(existing) = self.reservations.get(&gpio) {
            if existing.owner == owner && existing.function == function {
                return Ok(());
            }
            return Err(ReservationError::Conflict {
                gpio,
                owner: existing.owner,
                function: existing.function.clone(),
            });
        }

        if self.board.pin(gpio).is_none() {
            return Err(ReservationError::UnknownPin {
                gpio,
                board: self.board.id.clone(),
            });
        }

        self.reservations.insert(
            gpio,
            PinReservation {
                gpio,
                owner,
                function: function.to_string(),
            },
        );
        Ok(())
    }

    /// Pick and reserve a pin for `capability`.
    ///
    /// With `prefer_safe`, restricted pins rank after every unrestricted
    /// candidate. The sort is stable, so ties keep board declaration order.
    pub fn allocate(
        &mut self,
        owner: Uuid,
        capability: PinCapability,
        prefer_safe: bool,
    ) -> Option<u8> {
        let mut candidates = self.available_pins(capability);
        if prefer_safe {
            candidates.sort_by_key(|pin| pin.restricted);
        }

        let selected = candidates.first()?;
        tracing::debug!(
            "Allocated GPIO {} ({}) for {} to {}{}",
            selected.gpio,
            selected.label,
            capability,
            owner,
            if selected.restricted { " [restricted]" } else { "" }
        );

        let gpio = selected.gpio;
        self.reservations.insert(
            gpio,
            PinReservation {
                gpio,
                owner,
                function: capability.as_str().to_string(),
            },
        );
        Some(gpio)
    }

    /// Default pins of a shared bus, as `[SDA, SCL]` for I2C.
    ///
    /// Returned unconditionally: a GPIO already taken by a non-bus reservation
    /// is not detected here. SPI sharing is not supported.
    pub fn shared_bus(&self, bus: BusType) -> Option<[u8; 2]> {
        match bus {
            BusType::I2c => Some([self.board.default_i2c.sda, self.board.default_i2c.scl]),
            BusType::Spi => None,
        }
    }

    pub fn reservation(&self, gpio: u8) -> Option<&PinReservation> {
        self.reservations.get(&gpio)
    }

    /// All reservations ordered by GPIO number.
    pub fn reservations(&self) -> impl Iterator<Item = &PinReservation> {
        self.reservations.values()
    }

    pub fn reserved_count(&self) -> usize {
        self.reservations.len()
    }
}
