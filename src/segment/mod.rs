//! Named shared memory segments and the OS backends they map through

pub mod backend;
pub mod config;
pub mod region;

pub use backend::{
    Backend, FileBackend, MappedView, MappingBackend, MappingRequest, Opened, SegmentView,
    ShmBackend,
};
pub use config::{clamp_size, Backing, SegmentConfig};
pub use region::Segment;
