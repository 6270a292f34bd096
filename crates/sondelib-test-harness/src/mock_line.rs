//! Mock RS-485 driver-enable line.
//!
//! [`MockEnableLine`] records every assert/deassert into a log shared with
//! the test through [`MockEnableLine::events`], so the order of direction
//! switches can be checked after the line has been moved into a session.

use std::sync::{Arc, Mutex};

use sondelib_core::error::Result;
use sondelib_core::transport::EnableLine;

/// One recorded transition of the enable line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEvent {
    /// Switched to driver (transmit) mode.
    Asserted,
    /// Switched to receiver mode.
    Deasserted,
}

/// A recording [`EnableLine`].
#[derive(Debug, Clone, Default)]
pub struct MockEnableLine {
    log: Arc<Mutex<Vec<LineEvent>>>,
}

impl MockEnableLine {
    /// Create a line with an empty event log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all transitions recorded so far, oldest first.
    pub fn events(&self) -> Vec<LineEvent> {
        match self.log.lock() {
            Ok(log) => log.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, event: LineEvent) {
        match self.log.lock() {
            Ok(mut log) => log.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

impl EnableLine for MockEnableLine {
    fn assert(&mut self) -> Result<()> {
        self.record(LineEvent::Asserted);
        Ok(())
    }

    fn deassert(&mut self) -> Result<()> {
        self.record(LineEvent::Deasserted);
        Ok(())
    }
}
