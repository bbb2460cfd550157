//! Bounds-checked raw byte access to a mapped segment
//!
//! Reads and writes are plain byte copies at an offset. Nothing here locks,
//! versions or checksums the region: a write is visible to every process
//! mapping the same name as soon as the copy completes, and writers racing
//! on overlapping ranges interleave unpredictably.

use std::ops::Range;

use crate::{
    error::AccessError,
    segment::{MappingBackend, Segment},
};

/// Validate `[addr, addr + len)` against a region of `size` bytes.
///
/// Never computes `addr + len`, so adversarial inputs cannot wrap around.
pub fn check_range(addr: usize, len: usize, size: usize) -> Result<Range<usize>, AccessError> {
    if len > size || addr > size - len {
        return Err(AccessError::out_of_range(addr, len, size));
    }
    Ok(addr..addr + len)
}

/// Byte-range access to a fixed-size mapped region
pub trait RawAccessor {
    /// Whether the region is currently mapped
    fn is_mapped(&self) -> bool;

    /// Size of the addressable range `[0, capacity)`
    fn capacity(&self) -> usize;

    /// Copy `dest.len()` bytes starting at `addr` into `dest`
    fn read_into(&self, addr: usize, dest: &mut [u8]) -> Result<(), AccessError>;

    /// Copy all of `src` into the region starting at `addr`.
    ///
    /// A read-only region rejects every write, even an empty one.
    fn write_from(&mut self, addr: usize, src: &[u8]) -> Result<(), AccessError>;

    /// Read `len` bytes starting at `addr` into a new buffer
    fn read(&self, addr: usize, len: usize) -> Result<Vec<u8>, AccessError> {
        if !self.is_mapped() {
            return Err(AccessError::NotInitialized);
        }
        check_range(addr, len, self.capacity())?;

        let mut buf = vec![0u8; len];
        self.read_into(addr, &mut buf)?;
        Ok(buf)
    }
}

impl<B: MappingBackend> RawAccessor for Segment<B> {
    fn is_mapped(&self) -> bool {
        self.is_initialized()
    }

    fn capacity(&self) -> usize {
        self.size()
    }

    fn read_into(&self, addr: usize, dest: &mut [u8]) -> Result<(), AccessError> {
        let region = self.as_slice().ok_or(AccessError::NotInitialized)?;
        let range = check_range(addr, dest.len(), region.len())?;
        dest.copy_from_slice(&region[range]);
        Ok(())
    }

    fn write_from(&mut self, addr: usize, src: &[u8]) -> Result<(), AccessError> {
        if !self.is_initialized() {
            return Err(AccessError::NotInitialized);
        }
        let region = self.as_mut_slice().ok_or(AccessError::ReadOnly)?;
        let range = check_range(addr, src.len(), region.len())?;
        region[range].copy_from_slice(src);
        Ok(())
    }
}
