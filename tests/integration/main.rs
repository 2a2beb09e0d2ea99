//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that drives the trigger loop against
//! mock adapters on a simulated clock.  All tests run on the host with
//! no real hardware required.

mod heartbeat_tests;
mod mock_hw;
mod trigger_cycle_tests;
