//! FFI functions for segment lifecycle and raw access
//!
//! Every function answers with the numeric codes of the boundary surface:
//! `shmseg_init` with [`ShmsegInitCode`], reads and writes with
//! [`ShmsegAccessCode`]. An unknown handle reads as an uninitialized segment.

use std::{ffi::c_char, slice};

use crate::{access::RawAccessor, error::AccessError, segment::Segment};

use super::{
    types::{ShmsegAccessCode, ShmsegInitCode, ShmsegOpenMode, ShmsegSegmentHandle},
    utils::{registry, segment_name},
};

/// Convert C offsets into a checked `(addr, len)` pair
fn to_range(addr: i64, size: i64, capacity: usize) -> Result<(usize, usize), AccessError> {
    let (Ok(addr), Ok(len)) = (usize::try_from(addr), usize::try_from(size)) else {
        return Err(AccessError::out_of_range(0, 0, capacity));
    };
    crate::access::check_range(addr, len, capacity)?;
    Ok((addr, len))
}

/// Create an uninitialized segment handle
#[no_mangle]
pub extern "C" fn shmseg_segment_new() -> ShmsegSegmentHandle {
    let id = registry().store_segment(Segment::new());
    id as ShmsegSegmentHandle
}

/// Close and free a segment handle; returns false for an unknown handle
#[no_mangle]
pub extern "C" fn shmseg_segment_free(handle: ShmsegSegmentHandle) -> bool {
    if handle.is_null() {
        return false;
    }

    // Dropped outside the lock
    let segment = registry().remove_segment(handle as usize);
    segment.is_some()
}

/// Create or attach to the named segment with read/write access
///
/// # Safety
///
/// `name` must be null or point to a NUL-terminated string valid for the
/// duration of the call.
#[no_mangle]
pub unsafe extern "C" fn shmseg_init(
    handle: ShmsegSegmentHandle,
    name: *const c_char,
    size: i64,
) -> ShmsegInitCode {
    shmseg_init_with(handle, name, size, ShmsegOpenMode::CreateReadWrite)
}

/// Reach the named segment as `mode` says.
///
/// The `Open*` modes fail with `MappingCreateFailed` when the name is absent.
/// Writes to a segment opened with a read-only mode return
/// [`ShmsegAccessCode::ReadOnly`].
///
/// # Safety
///
/// `name` must be null or point to a NUL-terminated string valid for the
/// duration of the call.
#[no_mangle]
pub unsafe extern "C" fn shmseg_init_with(
    handle: ShmsegSegmentHandle,
    name: *const c_char,
    size: i64,
    mode: ShmsegOpenMode,
) -> ShmsegInitCode {
    if handle.is_null() {
        return ShmsegInitCode::InvalidArgument;
    }
    let Some(name) = segment_name(name) else {
        return ShmsegInitCode::InvalidArgument;
    };

    let mut registry = registry();
    match registry.get_segment_mut(handle as usize) {
        Some(segment) => {
            segment.set_create(mode.creates());
            segment.set_writable(mode.writable());
            segment.init(name, size).into()
        }
        None => ShmsegInitCode::InvalidArgument,
    }
}

/// Unmap and release the segment; safe to call repeatedly
#[no_mangle]
pub extern "C" fn shmseg_close(handle: ShmsegSegmentHandle) {
    if handle.is_null() {
        return;
    }

    if let Some(segment) = registry().get_segment_mut(handle as usize) {
        segment.close();
    }
}

/// Copy `size` bytes at `addr` of the segment into `buffer`
///
/// Nothing is copied unless the whole range is inside the segment.
///
/// # Safety
///
/// When `size > 0`, `buffer` must be null or valid for writes of `size`
/// bytes, and must not overlap the segment's mapping.
#[no_mangle]
pub unsafe extern "C" fn shmseg_read(
    handle: ShmsegSegmentHandle,
    buffer: *mut u8,
    addr: i64,
    size: i64,
) -> ShmsegAccessCode {
    let registry = registry();
    let Some(segment) = registry
        .get_segment(handle as usize)
        .filter(|s| s.is_initialized())
    else {
        return ShmsegAccessCode::NotInitialized;
    };

    let (addr, len) = match to_range(addr, size, segment.capacity()) {
        Ok(range) => range,
        Err(e) => return e.into(),
    };
    if len == 0 {
        return ShmsegAccessCode::Success;
    }
    if buffer.is_null() {
        return ShmsegAccessCode::OutOfRange;
    }

    let dest = slice::from_raw_parts_mut(buffer, len);
    segment.read_into(addr, dest).into()
}

/// Copy `size` bytes from `buffer` into the segment at `addr`
///
/// Nothing is written unless the whole range is inside the segment and the
/// segment was opened writable.
///
/// # Safety
///
/// When `size > 0`, `buffer` must be null or valid for reads of `size` bytes.
#[no_mangle]
pub unsafe extern "C" fn shmseg_write(
    handle: ShmsegSegmentHandle,
    buffer: *const u8,
    addr: i64,
    size: i64,
) -> ShmsegAccessCode {
    let mut registry = registry();
    let Some(segment) = registry
        .get_segment_mut(handle as usize)
        .filter(|s| s.is_initialized())
    else {
        return ShmsegAccessCode::NotInitialized;
    };
    if !segment.is_writable() {
        return ShmsegAccessCode::ReadOnly;
    }

    let (addr, len) = match to_range(addr, size, segment.capacity()) {
        Ok(range) => range,
        Err(e) => return e.into(),
    };
    if len == 0 {
        return ShmsegAccessCode::Success;
    }
    if buffer.is_null() {
        return ShmsegAccessCode::OutOfRange;
    }

    let src = slice::from_raw_parts(buffer, len);
    segment.write_from(addr, src).into()
}

/// Effective segment size, or 0 for an unknown or uninitialized handle
#[no_mangle]
pub extern "C" fn shmseg_size(handle: ShmsegSegmentHandle) -> usize {
    registry()
        .get_segment(handle as usize)
        .filter(|segment| segment.is_initialized())
        .map(|segment| segment.size())
        .unwrap_or(0)
}

/// Whether the last successful init attached to an existing segment
#[no_mangle]
pub extern "C" fn shmseg_already_existed(handle: ShmsegSegmentHandle) -> bool {
    registry()
        .get_segment(handle as usize)
        .map(|segment| segment.already_existed())
        .unwrap_or(false)
}

/// Whether the handle currently holds a mapping
#[no_mangle]
pub extern "C" fn shmseg_is_initialized(handle: ShmsegSegmentHandle) -> bool {
    registry()
        .get_segment(handle as usize)
        .map(|segment| segment.is_initialized())
        .unwrap_or(false)
}

/// Remove a segment name from the system; attached processes keep their views
///
/// # Safety
///
/// `name` must be null or point to a NUL-terminated string valid for the
/// duration of the call.
#[no_mangle]
pub unsafe extern "C" fn shmseg_remove(name: *const c_char) -> bool {
    match segment_name(name) {
        Some(name) if !name.is_empty() => Segment::remove(name).is_ok(),
        _ => false,
    }
}
