//! C Foreign Function Interface (FFI)
//!
//! Exposes segments to C and C++ callers through opaque handles and the
//! numeric result codes existing integrations expect.

pub mod segment;
pub mod types;
pub mod utils;
pub mod version;

// Re-export commonly used types and functions
pub use types::{ShmsegAccessCode, ShmsegInitCode, ShmsegOpenMode, ShmsegSegmentHandle};

pub use utils::{shmseg_init_logging, HANDLE_REGISTRY};

// Segment API
pub use segment::{
    shmseg_already_existed, shmseg_close, shmseg_init, shmseg_init_with, shmseg_is_initialized,
    shmseg_read, shmseg_remove, shmseg_segment_free, shmseg_segment_new, shmseg_size,
    shmseg_write,
};

// Version API
pub use version::{shmseg_max_segment_size, shmseg_version, shmseg_version_string};
