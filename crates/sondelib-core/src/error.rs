//! Error types for sondelib.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Physical transport failures, frame
//! validation failures and model-level refusals are all captured here.

/// Reasons an inbound Modbus RTU frame was rejected.
///
/// Produced by the frame codec and wrapped in [`Error::FrameInvalid`]. Every
/// variant usually points at wiring noise, a wrong baud rate or a wrong
/// slave address rather than at a device fault.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Fewer bytes than the smallest legal RTU reply (5 bytes).
    #[error("short frame: {len} bytes")]
    ShortFrame { len: usize },

    /// The trailing CRC-16 does not match the preceding bytes.
    #[error("CRC mismatch: frame carries 0x{received:04X}, computed 0x{computed:04X}")]
    CrcMismatch { received: u16, computed: u16 },

    /// The reply came from a different slave than the one addressed.
    #[error("slave id mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    SlaveIdMismatch { expected: u8, actual: u8 },

    /// The reply echoes a different function code than the request.
    #[error("function mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    FunctionMismatch { expected: u8, actual: u8 },

    /// The reply length is not one of the lengths expected for the request.
    #[error("length mismatch: expected one of {expected:?}, got {actual}")]
    LengthMismatch { expected: Vec<usize>, actual: usize },

    /// The device answered with a Modbus exception response.
    #[error("device exception 0x{code:02X} for function 0x{function:02X}")]
    Exception { function: u8, code: u8 },
}

/// The error type for all sondelib operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port, USB adapter).
    #[error("transport error: {0}")]
    Transport(String),

    /// Timed out waiting for the first byte of a response.
    ///
    /// This typically indicates the sensor is unpowered, busy, on a
    /// different baud rate, or wired to the wrong bus.
    #[error("timeout waiting for response")]
    Timeout,

    /// A response arrived but failed length, slave-id or CRC validation.
    #[error("invalid frame: {0}")]
    FrameInvalid(#[from] FrameError),

    /// The requested operation is not defined for the active sensor model.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// The operation needs a concrete sensor model, but the session's
    /// model is still unknown.
    #[error("sensor model unresolved")]
    ModelUnresolved,

    /// An invalid parameter was passed to a builder or sensor command.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No connection to the sensor has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the sensor was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` when the error came from the wire rather than from the
    /// caller: the device did not answer, answered garbage, or the transport
    /// failed underneath the transaction.
    pub fn is_communication_failure(&self) -> bool {
        matches!(
            self,
            Error::Timeout
                | Error::FrameInvalid(_)
                | Error::Transport(_)
                | Error::NotConnected
                | Error::ConnectionLost
                | Error::Io(_)
        )
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
