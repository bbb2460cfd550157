//! FFI type definitions and handle types

use std::ffi::c_void;

use crate::error::{AccessError, RecordError, SegmentError};

/// Opaque segment handle for the C API
pub type ShmsegSegmentHandle = *mut c_void;

/// Result codes of `shmseg_init`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShmsegInitCode {
    Success = 0,
    InvalidArgument = 1,
    MappingCreateFailed = 2,
    MappingViewFailed = 3,
}

impl From<&SegmentError> for ShmsegInitCode {
    fn from(error: &SegmentError) -> Self {
        match error {
            SegmentError::InvalidArgument { .. } => ShmsegInitCode::InvalidArgument,
            SegmentError::MappingCreateFailed { .. } => ShmsegInitCode::MappingCreateFailed,
            SegmentError::MappingViewFailed { .. } => ShmsegInitCode::MappingViewFailed,
        }
    }
}

impl From<Result<(), SegmentError>> for ShmsegInitCode {
    fn from(result: Result<(), SegmentError>) -> Self {
        match result {
            Ok(()) => ShmsegInitCode::Success,
            Err(e) => (&e).into(),
        }
    }
}

/// How `shmseg_init_with` reaches the named segment
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShmsegOpenMode {
    /// Create or attach, read/write
    CreateReadWrite = 0,
    /// Create or attach, read-only view
    CreateRead = 1,
    /// Attach to an existing name only, read/write
    OpenReadWrite = 2,
    /// Attach to an existing name only, read-only view
    OpenRead = 3,
}

impl ShmsegOpenMode {
    /// Whether a missing name is created
    pub fn creates(self) -> bool {
        matches!(self, Self::CreateReadWrite | Self::CreateRead)
    }

    /// Whether the view accepts writes
    pub fn writable(self) -> bool {
        matches!(self, Self::CreateReadWrite | Self::OpenReadWrite)
    }
}

/// Result codes of `shmseg_read` and `shmseg_write`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShmsegAccessCode {
    Success = 0,
    NotInitialized = 1,
    OutOfRange = 2,
    /// Record encode/decode failure; only produced by record-level calls
    CodecFailed = 3,
    /// Write to a segment opened read-only
    ReadOnly = 4,
}

impl From<AccessError> for ShmsegAccessCode {
    fn from(error: AccessError) -> Self {
        match error {
            AccessError::NotInitialized => ShmsegAccessCode::NotInitialized,
            AccessError::OutOfRange { .. } => ShmsegAccessCode::OutOfRange,
            AccessError::ReadOnly => ShmsegAccessCode::ReadOnly,
        }
    }
}

impl From<RecordError> for ShmsegAccessCode {
    fn from(error: RecordError) -> Self {
        match error {
            RecordError::Access(e) => e.into(),
            RecordError::Codec(_) => ShmsegAccessCode::CodecFailed,
        }
    }
}

impl From<Result<(), AccessError>> for ShmsegAccessCode {
    fn from(result: Result<(), AccessError>) -> Self {
        match result {
            Ok(()) => ShmsegAccessCode::Success,
            Err(e) => e.into(),
        }
    }
}
