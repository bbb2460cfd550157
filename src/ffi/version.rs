//! FFI version and limits
//!
//! C callers compare the packed version against the one they were built
//! with before touching any segment.

use std::ffi::c_char;

/// NUL-terminated copy of the crate version, owned by the library
static VERSION_CSTR: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();

/// Pack a version as `major << 16 | minor << 8 | patch`
pub const fn pack_version(major: u32, minor: u32, patch: u32) -> u32 {
    (major << 16) | (minor << 8) | patch
}

/// Library version packed as `major << 16 | minor << 8 | patch`
#[no_mangle]
pub extern "C" fn shmseg_version() -> u32 {
    pack_version(crate::VERSION_MAJOR, crate::VERSION_MINOR, crate::VERSION_PATCH)
}

/// Static version string; never freed by the caller
#[no_mangle]
pub extern "C" fn shmseg_version_string() -> *const c_char {
    VERSION_CSTR.as_ptr() as *const c_char
}

/// Largest segment `shmseg_init` will map; larger or non-positive sizes clamp to it
#[no_mangle]
pub extern "C" fn shmseg_max_segment_size() -> u64 {
    crate::config::MAX_SEGMENT_SIZE as u64
}
