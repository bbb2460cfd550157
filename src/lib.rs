//! # shmseg - Named Cross-Process Shared Memory Segments
//!
//! shmseg maps a named shared memory object into the current process so that
//! otherwise unrelated processes can exchange raw bytes or fixed-layout
//! records through it.
//!
//! ## Features
//!
//! - **Create-or-attach**: the first process creates the segment, later ones
//!   attach and are told so through [`Segment::already_existed`]
//! - **Bounds-checked raw access**: overflow-safe offset/length validation
//! - **Fixed-layout records**: compile-time sized, little-endian, no padding
//! - **Deterministic cleanup**: unmap and release on `close` or drop
//! - **C API**: numeric result codes for existing integrations (`c-api` feature)
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │   Segment    │──▶│ RawAccessor  │──▶│ RecordCodec  │
//! │ init / close │   │ read / write │   │ read_record  │
//! └──────┬───────┘   └──────────────┘   │ write_record │
//!        │                              └──────────────┘
//!        ▼
//! ┌─────────────────────────────┐
//! │ MappingBackend (shm, file)  │
//! └─────────────────────────────┘
//! ```
//!
//! There is no locking between processes. Writers racing on overlapping
//! ranges interleave unpredictably; callers wanting consistent snapshots
//! must coordinate with an external lock.
//!
//! ## Example
//!
//! ```no_run
//! use shmseg::{RawAccessor, Segment};
//!
//! let mut a = Segment::open("demo", 1024)?;
//! let b = Segment::open("demo", 1024)?;
//! assert!(!a.already_existed());
//! assert!(b.already_existed());
//!
//! a.write_from(0, &[1, 2, 3])?;
//! assert_eq!(b.read(0, 3)?, vec![1, 2, 3]);
//! # Ok::<(), shmseg::ShmError>(())
//! ```

pub mod access;
pub mod error;
pub mod record;
pub mod segment;

#[cfg(feature = "c-api")]
pub mod ffi;

// Main API re-exports
pub use access::{check_range, RawAccessor};
pub use error::{AccessError, CodecError, RecordError, Result, SegmentError, ShmError};
pub use record::{Record, RecordAccessorExt};
pub use segment::{
    Backend, Backing, FileBackend, MappingBackend, MappingRequest, Segment, SegmentConfig,
    ShmBackend,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const VERSION_MAJOR: u32 = 0;
pub const VERSION_MINOR: u32 = 2;
pub const VERSION_PATCH: u32 = 0;

/// Default configuration constants
pub mod config {
    /// Hard ceiling on a segment's size (8 MiB); also the fallback size
    pub const MAX_SEGMENT_SIZE: usize = 8 * 1024 * 1024;
}
