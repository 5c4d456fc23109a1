//! Board pin model and pin allocation.

pub mod allocator;
pub mod board;

pub use allocator::{PinAllocator, PinReservation, ReservationError};
pub use board::{
    BoardDefinition, BootState, BusType, I2cPins, McuFamily, PinCapability, PinDefinition, SpiPins,
};
