//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the rules for one TagRing trigger cycle: phase
//! orchestration, feedback selection, and heartbeat scheduling.  All
//! interaction with hardware happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
