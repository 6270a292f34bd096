//! Mock transport for deterministic testing of the Modbus engine.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! request/response pairs. This lets you test RTU frame encoding, response
//! validation and payload decoding without real hardware.
//!
//! # Example
//!
//! ```
//! use sondelib_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // Pre-load: when the master sends this request, return this response.
//! mock.expect(&[0x01, 0x03, 0x30, 0x00, 0x00, 0x01, 0x8B, 0x0A],
//!             &[0x01, 0x03, 0x02, 0x01, 0x00, 0xB9, 0xD4]);
//! ```

use std::collections::VecDeque;

use sondelib_core::error::{Error, Result};
use sondelib_core::transport::Transport;

/// A pre-loaded request/response pair for the mock transport.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact bytes we expect to be written.
    request: Vec<u8>,
    /// The bytes that become readable once the request is written.
    /// `None` means the device stays silent.
    response: Option<Vec<u8>>,
}

/// A mock [`Transport`] for testing without hardware.
///
/// Expectations are consumed in order. When `write()` is called, the data is
/// recorded and matched against the next expectation; the corresponding
/// response then becomes visible through `bytes_available()` and `read()`.
///
/// If no expectation matches or the queue is exhausted, an error is returned.
#[derive(Debug)]
pub struct MockTransport {
    /// Ordered queue of expected request/response pairs.
    expectations: VecDeque<Expectation>,
    /// Received bytes not yet read by the master.
    rx: VecDeque<u8>,
    /// Whether the transport is "connected".
    connected: bool,
    /// Log of all bytes written through this transport.
    sent_log: Vec<Vec<u8>>,
    /// Number of `flush()` calls.
    flushes: usize,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            expectations: VecDeque::new(),
            rx: VecDeque::new(),
            connected: true,
            sent_log: Vec::new(),
            flushes: 0,
        }
    }

    /// Add an expected request/response pair.
    ///
    /// When `write()` is called with data matching `request`, `response`
    /// becomes readable.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            response: Some(response.to_vec()),
        });
    }

    /// Add an expected request that the device never answers.
    pub fn expect_silence(&mut self, request: &[u8]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            response: None,
        });
    }

    /// Make bytes readable immediately, as if a previous slow device had
    /// replied late.
    pub fn inject_stale(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    /// Return all data that has been written through this transport.
    ///
    /// Each element is the byte slice from one `write()` call.
    pub fn sent_data(&self) -> &[Vec<u8>] {
        &self.sent_log
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Return the number of times `flush()` was called.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    /// Set the connected state of the mock transport.
    ///
    /// When set to `false`, subsequent calls return [`Error::NotConnected`].
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        self.sent_log.push(data.to_vec());

        let expectation = self
            .expectations
            .pop_front()
            .ok_or_else(|| Error::Transport("no more expectations in mock transport".into()))?;
        if data != expectation.request.as_slice() {
            return Err(Error::Transport(format!(
                "unexpected write: expected {:02X?}, got {:02X?}",
                expectation.request, data
            )));
        }
        if let Some(response) = expectation.response {
            self.rx.extend(response);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.flushes += 1;
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        Ok(self.rx.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        let n = self.rx.len().min(buf.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.rx.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
