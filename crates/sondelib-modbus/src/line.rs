//! Half-duplex RS-485 line discipline.
//!
//! [`LineTransceiver`] owns the transport and the optional driver-enable
//! output. One call to [`transact`](LineTransceiver::transact) is one
//! request/reply exchange:
//!
//! 1. discard stale input left over from an earlier, late reply
//! 2. assert driver-enable, wait the settle delay
//! 3. write the frame and block until it has been flushed
//! 4. deassert driver-enable, wait the settle delay
//! 5. poll until the first reply byte arrives or the response timeout ends
//! 6. read until the line stays quiet for one frame gap; bytes beyond the
//!    buffer capacity are read and thrown away; if the line is still busy
//!    one response timeout after the first byte, the exchange times out
//!
//! The call blocks. Only one transaction may be in flight per transport;
//! sessions sharing a physical bus must serialize their calls.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use sondelib_core::error::{Error, Result};
use sondelib_core::transport::{EnableLine, Transport};

/// Timing parameters of the line discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineConfig {
    /// Time to hold after switching transceiver direction.
    pub settle_delay: Duration,
    /// Maximum wait for the first reply byte, and for the rest of the
    /// reply once it has started.
    pub response_timeout: Duration,
    /// Sleep between polls of the transport.
    pub poll_interval: Duration,
    /// Silence that marks the end of a reply.
    pub frame_gap: Duration,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(8),
            response_timeout: Duration::from_millis(500),
            poll_interval: Duration::from_millis(1),
            frame_gap: Duration::from_millis(10),
        }
    }
}

/// Owner of a transport and its direction-control line.
pub struct LineTransceiver {
    transport: Box<dyn Transport>,
    enable: Option<Box<dyn EnableLine>>,
    config: LineConfig,
}

impl LineTransceiver {
    /// Wrap an opened transport. `enable` is `None` for adapters that
    /// switch direction automatically.
    pub fn new(
        transport: Box<dyn Transport>,
        enable: Option<Box<dyn EnableLine>>,
        config: LineConfig,
    ) -> Self {
        LineTransceiver {
            transport,
            enable,
            config,
        }
    }

    /// The active timing parameters.
    pub fn config(&self) -> &LineConfig {
        &self.config
    }

    /// Send `frame` and collect the reply into `buf`.
    ///
    /// Returns the number of reply bytes stored, which is at least one.
    /// Fails with [`Error::Timeout`] if nothing arrives within the response
    /// timeout, or if the line has not gone quiet one response timeout after
    /// the first byte.
    pub fn transact(&mut self, frame: &[u8], buf: &mut [u8]) -> Result<usize> {
        let stale = self.discard_input()?;
        if stale > 0 {
            warn!(bytes = stale, "discarded stale input before transmit");
        }

        self.driver_enable()?;
        trace!(bytes = frame.len(), data = ?frame, "Sending frame");
        let sent = self
            .transport
            .write(frame)
            .and_then(|()| self.transport.flush());
        // Always hand the bus back, even if the write failed.
        self.receiver_enable()?;
        sent?;

        self.wait_for_reply()?;
        let received = self.read_reply(buf)?;
        trace!(bytes = received, data = ?&buf[..received], "Received frame");
        Ok(received)
    }

    /// Close the underlying transport.
    pub fn close(&mut self) -> Result<()> {
        self.transport.close()
    }

    /// Whether the underlying transport is still open.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    fn driver_enable(&mut self) -> Result<()> {
        if let Some(line) = self.enable.as_mut() {
            line.assert()?;
            thread::sleep(self.config.settle_delay);
        }
        Ok(())
    }

    fn receiver_enable(&mut self) -> Result<()> {
        if let Some(line) = self.enable.as_mut() {
            line.deassert()?;
            thread::sleep(self.config.settle_delay);
        }
        Ok(())
    }

    /// Block until at least one byte is readable or the timeout passes.
    fn wait_for_reply(&mut self) -> Result<()> {
        let start = Instant::now();
        loop {
            if self.transport.bytes_available()? > 0 {
                return Ok(());
            }
            if start.elapsed() >= self.config.response_timeout {
                debug!(
                    timeout_ms = self.config.response_timeout.as_millis() as u64,
                    "no reply before timeout"
                );
                return Err(Error::Timeout);
            }
            thread::sleep(self.config.poll_interval);
        }
    }

    /// Read until the line stays quiet for one frame gap.
    ///
    /// The whole receive phase is bounded by the response timeout, counted
    /// from the first byte; a line that never goes quiet ends in
    /// [`Error::Timeout`]. A zero-byte read counts as quiet time.
    fn read_reply(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut received = 0;
        let mut overflow = 0;
        let mut scratch = [0u8; 64];
        let deadline = Instant::now() + self.config.response_timeout;
        let mut last_byte = Instant::now();

        loop {
            if Instant::now() >= deadline {
                warn!(
                    bytes = received + overflow,
                    timeout_ms = self.config.response_timeout.as_millis() as u64,
                    "line never went quiet, reply abandoned"
                );
                return Err(Error::Timeout);
            }

            let mut n = 0;
            if self.transport.bytes_available()? > 0 {
                if received < buf.len() {
                    n = self.transport.read(&mut buf[received..])?;
                    received += n;
                } else {
                    n = self.transport.read(&mut scratch)?;
                    overflow += n;
                }
            }

            if n > 0 {
                last_byte = Instant::now();
            } else if last_byte.elapsed() >= self.config.frame_gap {
                break;
            } else {
                thread::sleep(self.config.poll_interval);
            }
        }

        if received == 0 {
            debug!("transport signalled data but none could be read");
            return Err(Error::Timeout);
        }
        if overflow > 0 {
            warn!(
                bytes = overflow,
                capacity = buf.len(),
                "reply exceeded buffer, trailing bytes discarded"
            );
        }
        Ok(received)
    }

    /// Drop whatever is waiting in the receive buffer, for at most one
    /// response timeout.
    fn discard_input(&mut self) -> Result<usize> {
        let mut scratch = [0u8; 64];
        let mut discarded = 0;
        let deadline = Instant::now() + self.config.response_timeout;
        while self.transport.bytes_available()? > 0 {
            if Instant::now() >= deadline {
                warn!(bytes = discarded, "input still arriving, transmitting anyway");
                break;
            }
            let n = self.transport.read(&mut scratch)?;
            if n == 0 {
                break;
            }
            discarded += n;
        }
        Ok(discarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sondelib_test_harness::{LineEvent, MockEnableLine, MockTransport};

    fn fast_config() -> LineConfig {
        LineConfig {
            settle_delay: Duration::ZERO,
            response_timeout: Duration::from_millis(50),
            poll_interval: Duration::from_millis(1),
            frame_gap: Duration::from_millis(2),
        }
    }

    #[test]
    fn transact_returns_reply() {
        let mut mock = MockTransport::new();
        mock.expect(&[0x01, 0x02], &[0x0A, 0x0B, 0x0C]);
        let mut line = LineTransceiver::new(Box::new(mock), None, fast_config());

        let mut buf = [0u8; 8];
        let n = line.transact(&[0x01, 0x02], &mut buf).unwrap();
        assert_eq!(&buf[..n], &[0x0A, 0x0B, 0x0C]);
    }

    #[test]
    fn enable_line_brackets_the_write() {
        let enable = MockEnableLine::new();
        let mut mock = MockTransport::new();
        mock.expect(&[0x01], &[0x02]);
        let mut line = LineTransceiver::new(
            Box::new(mock),
            Some(Box::new(enable.clone())),
            fast_config(),
        );

        let mut buf = [0u8; 4];
        line.transact(&[0x01], &mut buf).unwrap();
        assert_eq!(enable.events(), vec![LineEvent::Asserted, LineEvent::Deasserted]);
    }

    #[test]
    fn enable_line_released_when_write_fails() {
        let enable = MockEnableLine::new();
        let mock = MockTransport::new(); // no expectations: write fails
        let mut line = LineTransceiver::new(
            Box::new(mock),
            Some(Box::new(enable.clone())),
            fast_config(),
        );

        let mut buf = [0u8; 4];
        assert!(line.transact(&[0x01], &mut buf).is_err());
        assert_eq!(enable.events(), vec![LineEvent::Asserted, LineEvent::Deasserted]);
    }

    #[test]
    fn timeout_is_bounded() {
        let mut mock = MockTransport::new();
        mock.expect_silence(&[0x01]);
        let config = fast_config();
        let mut line = LineTransceiver::new(Box::new(mock), None, config);

        let mut buf = [0u8; 4];
        let start = Instant::now();
        let result = line.transact(&[0x01], &mut buf);
        let elapsed = start.elapsed();

        assert!(matches!(result, Err(Error::Timeout)));
        assert!(elapsed >= config.response_timeout);
        // One poll interval of slack plus scheduler jitter.
        assert!(elapsed < config.response_timeout + Duration::from_millis(100));
    }

    #[test]
    fn oversize_reply_is_drained() {
        let reply: Vec<u8> = (0u8..100).collect();
        let mut mock = MockTransport::new();
        mock.expect(&[0x01], &reply);
        let mut line = LineTransceiver::new(Box::new(mock), None, fast_config());

        let mut buf = [0u8; 40];
        let n = line.transact(&[0x01], &mut buf).unwrap();
        assert_eq!(n, 40);
        assert_eq!(&buf[..], &reply[..40]);
    }

    #[test]
    fn stale_input_is_discarded_before_sending() {
        let mut mock = MockTransport::new();
        mock.inject_stale(&[0xDE, 0xAD]);
        mock.expect(&[0x01], &[0x05]);
        let mut line = LineTransceiver::new(Box::new(mock), None, fast_config());

        let mut buf = [0u8; 4];
        let n = line.transact(&[0x01], &mut buf).unwrap();
        assert_eq!(&buf[..n], &[0x05]);
    }

    #[test]
    fn session_survives_a_timeout() {
        let mut mock = MockTransport::new();
        mock.expect_silence(&[0x01]);
        mock.expect(&[0x01], &[0x07]);
        let mut line = LineTransceiver::new(Box::new(mock), None, fast_config());

        let mut buf = [0u8; 4];
        assert!(line.transact(&[0x01], &mut buf).is_err());
        assert_eq!(line.transact(&[0x01], &mut buf).unwrap(), 1);
    }

    /// Transport that always reports input and hands out one byte per
    /// millisecond, like a bus that never goes quiet.
    struct ChatteringTransport;

    impl Transport for ChatteringTransport {
        fn write(&mut self, _data: &[u8]) -> Result<()> {
            Ok(())
        }
        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
        fn bytes_available(&mut self) -> Result<usize> {
            Ok(1)
        }
        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            thread::sleep(Duration::from_millis(1));
            buf[0] = 0x55;
            Ok(1)
        }
        fn close(&mut self) -> Result<()> {
            Ok(())
        }
        fn is_connected(&self) -> bool {
            true
        }
    }

    /// Transport that claims input is waiting but never delivers any.
    struct PhantomInputTransport;

    impl Transport for PhantomInputTransport {
        fn write(&mut self, _data: &[u8]) -> Result<()> {
            Ok(())
        }
        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
        fn bytes_available(&mut self) -> Result<usize> {
            Ok(1)
        }
        fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
            Ok(0)
        }
        fn close(&mut self) -> Result<()> {
            Ok(())
        }
        fn is_connected(&self) -> bool {
            true
        }
    }

    #[test]
    fn chattering_bus_ends_in_timeout() {
        let config = fast_config();
        let mut line = LineTransceiver::new(Box::new(ChatteringTransport), None, config);

        let mut buf = [0u8; 40];
        let start = Instant::now();
        let result = line.transact(&[0x01], &mut buf);
        let elapsed = start.elapsed();

        assert!(matches!(result, Err(Error::Timeout)));
        // Stale-input drain and reply phase are each bounded by the timeout.
        assert!(elapsed < 2 * config.response_timeout + Duration::from_millis(200));
    }

    #[test]
    fn empty_reads_count_as_silence() {
        let config = fast_config();
        let mut line = LineTransceiver::new(Box::new(PhantomInputTransport), None, config);

        let mut buf = [0u8; 8];
        let start = Instant::now();
        let result = line.transact(&[0x01], &mut buf);

        assert!(matches!(result, Err(Error::Timeout)));
        assert!(start.elapsed() < config.response_timeout);
    }
}
