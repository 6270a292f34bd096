//! sondelib-test-harness: Test utilities and mock hardware for sondelib.
//!
//! This crate provides [`MockTransport`] for deterministic unit testing of
//! the Modbus engine and sensor drivers without a real RS-485 bus, and
//! [`MockEnableLine`] for observing driver-enable switching.

pub mod mock_line;
pub mod mock_serial;

pub use mock_line::{LineEvent, MockEnableLine};
pub use mock_serial::MockTransport;
