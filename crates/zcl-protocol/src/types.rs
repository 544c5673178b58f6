//! Common types used throughout the protocol

use thiserror::Error;

/// Errors raised while reading or writing a frame payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Parsing ran past the written payload. Callers iterating record
    /// lists treat this as "no more records".
    #[error("Frame underrun: needed {needed} bytes, {remaining} remaining")]
    Underrun { needed: usize, remaining: usize },

    #[error("Frame overflow: needed {needed} bytes, capacity {capacity}")]
    Overflow { needed: usize, capacity: usize },

    #[error("Frame too short: {0} bytes")]
    TooShort(usize),

    #[error("Unknown data type: {0:#04X}")]
    UnknownDataType(u8),

    #[error("Data type {0:#04X} cannot be handled here")]
    UnsupportedDataType(u8),

    #[error("Value {value} does not fit data type {data_type:#04X}")]
    ValueMismatch { data_type: u8, value: String },
}

impl FrameError {
    /// Check if this error only signals the end of the payload
    #[must_use]
    pub fn is_underrun(&self) -> bool {
        matches!(self, FrameError::Underrun { .. })
    }
}

/// Errors surfaced by the ZCL engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZclError {
    #[error("Request timeout")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol mismatch: {0}")]
    ProtocolMismatch(String),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Unsupported attribute")]
    UnsupportedAttribute,

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Invalid attribute value")]
    InvalidAttributeValue,

    #[error("Read-only attribute")]
    ReadOnlyAttribute,

    #[error("Not authorized")]
    NotAuthorized,

    #[error("Device returned ZCL status {0:#04X}")]
    ProtocolStatus(u8),

    #[error("Unsupported general command {command_id:#04X} (status {status:#04X})")]
    UnsupportedGeneralCommand { command_id: u8, status: u8 },

    #[error("Default response for command {command_id:#04X} reported success, a data response was expected")]
    UnexpectedDefaultResponseSuccess { command_id: u8 },

    #[error("Service cluster not attached to a device")]
    NotAttached,
}

impl From<FrameError> for ZclError {
    fn from(err: FrameError) -> Self {
        ZclError::MalformedMessage(err.to_string())
    }
}

/// ZCL status codes
pub mod status {
    pub const SUCCESS: u8 = 0x00;
    pub const FAILURE: u8 = 0x01;
    pub const NOT_AUTHORIZED: u8 = 0x7E;
    pub const RESERVED_FIELD_NOT_ZERO: u8 = 0x7F;
    pub const MALFORMED_COMMAND: u8 = 0x80;
    pub const UNSUP_CLUSTER_COMMAND: u8 = 0x81;
    pub const UNSUP_GENERAL_COMMAND: u8 = 0x82;
    pub const UNSUP_MANUF_CLUSTER_COMMAND: u8 = 0x83;
    pub const UNSUP_MANUF_GENERAL_COMMAND: u8 = 0x84;
    pub const INVALID_FIELD: u8 = 0x85;
    pub const UNSUPPORTED_ATTRIBUTE: u8 = 0x86;
    pub const INVALID_VALUE: u8 = 0x87;
    pub const READ_ONLY: u8 = 0x88;
    pub const INSUFFICIENT_SPACE: u8 = 0x89;
    pub const DUPLICATE_EXISTS: u8 = 0x8A;
    pub const NOT_FOUND: u8 = 0x8B;
    pub const UNREPORTABLE_ATTRIBUTE: u8 = 0x8C;
    pub const INVALID_DATA_TYPE: u8 = 0x8D;
    pub const INVALID_SELECTOR: u8 = 0x8E;
    pub const WRITE_ONLY: u8 = 0x8F;
    pub const INCONSISTENT_STARTUP_STATE: u8 = 0x90;
    pub const DEFINED_OUT_OF_BAND: u8 = 0x91;
    pub const INCONSISTENT: u8 = 0x92;
    pub const ACTION_DENIED: u8 = 0x93;
    pub const TIMEOUT: u8 = 0x94;
    pub const HARDWARE_FAILURE: u8 = 0xC0;
    pub const SOFTWARE_FAILURE: u8 = 0xC1;
    pub const CALIBRATION_ERROR: u8 = 0xC2;
}

/// Decoded attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum ZclValue {
    /// No data, or an invalid string marker
    Null,
    Bool(bool),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    String(String),
    Octets(Vec<u8>),
}

impl ZclValue {
    /// Numeric view of the value, if it has one
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ZclValue::Unsigned(v) => Some(*v as f64),
            ZclValue::Signed(v) => Some(*v as f64),
            ZclValue::Float(v) => Some(*v),
            ZclValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

impl std::fmt::Display for ZclValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZclValue::Null => write!(f, "null"),
            ZclValue::Bool(v) => write!(f, "{v}"),
            ZclValue::Unsigned(v) => write!(f, "{v}"),
            ZclValue::Signed(v) => write!(f, "{v}"),
            ZclValue::Float(v) => write!(f, "{v}"),
            ZclValue::String(v) => write!(f, "{v:?}"),
            ZclValue::Octets(v) => write!(f, "{v:02X?}"),
        }
    }
}
