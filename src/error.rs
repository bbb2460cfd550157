//! Error types and handling for shmseg
//!
//! Each stage of the pipeline has its own error enum so callers can match on
//! exactly the failures an operation can produce. Every enum carries a `code()`
//! that maps it onto the numeric boundary codes used by the C API.

use std::io;

/// Result type alias for shmseg operations
pub type Result<T> = std::result::Result<T, ShmError>;

/// Failures while creating or attaching a segment
#[derive(Debug, thiserror::Error)]
pub enum SegmentError {
    /// Rejected before any OS interaction
    #[error("Invalid argument: {parameter} - {message}")]
    InvalidArgument { parameter: String, message: String },

    /// The named mapping could not be created or opened
    #[error("Failed to create mapping '{name}': {source}")]
    MappingCreateFailed {
        name: String,
        #[source]
        source: io::Error,
    },

    /// The mapping exists but could not be mapped into this process
    #[error("Failed to map view of '{name}': {source}")]
    MappingViewFailed {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl SegmentError {
    /// Create an invalid argument error
    pub fn invalid_argument(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a mapping creation error
    pub fn create_failed(name: impl Into<String>, source: io::Error) -> Self {
        Self::MappingCreateFailed {
            name: name.into(),
            source,
        }
    }

    /// Create a view mapping error
    pub fn view_failed(name: impl Into<String>, source: io::Error) -> Self {
        Self::MappingViewFailed {
            name: name.into(),
            source,
        }
    }

    /// Boundary code: 1 invalid argument, 2 create failed, 3 view failed
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidArgument { .. } => 1,
            Self::MappingCreateFailed { .. } => 2,
            Self::MappingViewFailed { .. } => 3,
        }
    }
}

/// Failures of bounds-checked raw access
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("Segment is not initialized")]
    NotInitialized,

    #[error("Out of range: address {addr} + length {len} exceeds segment size {size}")]
    OutOfRange { addr: usize, len: usize, size: usize },

    #[error("Segment is mapped read-only")]
    ReadOnly,
}

impl AccessError {
    /// Create an out of range error
    pub fn out_of_range(addr: usize, len: usize, size: usize) -> Self {
        Self::OutOfRange { addr, len, size }
    }

    /// Boundary code: 1 not initialized, 2 out of range, 4 read-only
    pub fn code(&self) -> i32 {
        match self {
            Self::NotInitialized => 1,
            Self::OutOfRange { .. } => 2,
            Self::ReadOnly => 4,
        }
    }
}

/// Failures turning records into bytes and back
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("Encode failed for {record}: {message}")]
    EncodeFailed {
        record: &'static str,
        message: String,
    },

    #[error("Decode failed for {record}: {message}")]
    DecodeFailed {
        record: &'static str,
        message: String,
    },
}

impl CodecError {
    /// Create an encode error
    pub fn encode(record: &'static str, message: impl Into<String>) -> Self {
        Self::EncodeFailed {
            record,
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(record: &'static str, message: impl Into<String>) -> Self {
        Self::DecodeFailed {
            record,
            message: message.into(),
        }
    }
}

/// Failures of record-level reads and writes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl RecordError {
    /// Boundary code: the access codes, plus 3 for a codec failure
    pub fn code(&self) -> i32 {
        match self {
            Self::Access(e) => e.code(),
            Self::Codec(_) => 3,
        }
    }
}

/// Umbrella error for callers that drive the whole pipeline
#[derive(Debug, thiserror::Error)]
pub enum ShmError {
    #[error(transparent)]
    Segment(#[from] SegmentError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// I/O outside the mapping lifecycle (flush, remove)
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<io::Error>,
    },
}

impl ShmError {
    /// Create an I/O error from a standard I/O error
    pub fn from_io(source: io::Error, context: &str) -> Self {
        Self::Io {
            message: format!("{}: {}", context, source),
            source: Some(source),
        }
    }
}

impl From<RecordError> for ShmError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::Access(e) => Self::Access(e),
            RecordError::Codec(e) => Self::Codec(e),
        }
    }
}

impl From<io::Error> for ShmError {
    fn from(err: io::Error) -> Self {
        Self::from_io(err, "I/O operation failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_error_codes() {
        assert_eq!(SegmentError::invalid_argument("name", "empty").code(), 1);
        let io = io::Error::new(io::ErrorKind::Other, "boom");
        assert_eq!(SegmentError::create_failed("x", io).code(), 2);
        let io = io::Error::new(io::ErrorKind::Other, "boom");
        assert_eq!(SegmentError::view_failed("x", io).code(), 3);
    }

    #[test]
    fn test_access_error_codes() {
        assert_eq!(AccessError::NotInitialized.code(), 1);
        assert_eq!(AccessError::out_of_range(10, 5, 12).code(), 2);
        assert_eq!(AccessError::ReadOnly.code(), 4);
    }

    #[test]
    fn test_record_error_codes() {
        let err: RecordError = AccessError::NotInitialized.into();
        assert_eq!(err.code(), 1);

        let err: RecordError = CodecError::decode("u32", "short").into();
        assert_eq!(err.code(), 3);
    }

    #[test]
    fn test_error_display() {
        let err = AccessError::out_of_range(8_388_600, 100, 8_388_608);
        let display = format!("{}", err);
        assert!(display.contains("8388600"));
        assert!(display.contains("8388608"));

        let err = SegmentError::invalid_argument("name", "Segment name cannot be empty");
        assert!(format!("{}", err).contains("Invalid argument"));
    }

    #[test]
    fn test_umbrella_conversion() {
        let err: ShmError = RecordError::from(AccessError::NotInitialized).into();
        assert!(matches!(err, ShmError::Access(AccessError::NotInitialized)));
    }
}
