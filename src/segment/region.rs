//! Named shared memory segment lifecycle

use std::fmt;

use log::{debug, warn};

use crate::error::{SegmentError, ShmError};

use super::{
    backend::{Backend, MappingBackend, MappingRequest, Opened, SegmentView},
    config::{clamp_size, SegmentConfig},
};

/// A mapped view together with the handle it was mapped from.
///
/// Field order is drop order: the view is unmapped before the handle closes.
struct Mapping<B: MappingBackend> {
    view: B::View,
    handle: B::Handle,
    writable: bool,
}

impl<B: MappingBackend> fmt::Debug for Mapping<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapping")
            .field("base", &self.view.as_ptr())
            .field("len", &self.view.len())
            .field("writable", &self.writable)
            .finish()
    }
}

/// One named shared memory mapping and its lifecycle state
///
/// A segment starts uninitialized, becomes initialized through [`Segment::init`],
/// and releases its mapping on [`Segment::close`] or when dropped.
#[derive(Debug)]
pub struct Segment<B: MappingBackend = Backend> {
    backend: B,
    name: String,
    size: usize,
    permissions: u32,
    create: bool,
    writable: bool,
    unlink_on_close: bool,
    already_existed: bool,
    mapping: Option<Mapping<B>>,
}

impl Segment<Backend> {
    /// Create an uninitialized segment backed by POSIX shared memory
    pub fn new() -> Self {
        Self::with_backend(Backend::default())
    }

    /// Create-or-attach a POSIX shared memory segment in one step
    pub fn open(name: &str, size: i64) -> Result<Self, SegmentError> {
        let mut segment = Self::new();
        segment.init(name, size)?;
        Ok(segment)
    }

    /// Create-or-attach a segment described by `config`
    pub fn with_config(config: SegmentConfig) -> Result<Self, SegmentError> {
        config.validate()?;

        let mut segment = Self::with_backend(Backend::from(&config.backing));
        segment.permissions = config.permissions;
        segment.create = config.create;
        segment.writable = config.writable;
        segment.unlink_on_close = config.unlink_on_close;
        segment.init(&config.name, config.size)?;
        Ok(segment)
    }

    /// Remove a POSIX shared memory name without attaching to it
    pub fn remove(name: &str) -> crate::Result<()> {
        Backend::default()
            .remove(name)
            .map_err(|e| ShmError::from_io(e, &format!("Failed to remove '{}'", name)))
    }
}

impl Default for Segment<Backend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: MappingBackend> Segment<B> {
    /// Create an uninitialized segment on an explicit backend
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            name: String::new(),
            size: 0,
            permissions: 0o600,
            create: true,
            writable: true,
            unlink_on_close: false,
            already_existed: false,
            mapping: None,
        }
    }

    /// Create or attach to the mapping `name` of `size` bytes.
    ///
    /// `size` outside `(0, 8 MiB]` is clamped to 8 MiB. Calling `init` on an
    /// initialized segment closes the current mapping first. On failure the
    /// segment is left uninitialized, holds no handles, and `name()`/`size()`
    /// still describe the last mapping that succeeded.
    pub fn init(&mut self, name: &str, size: i64) -> Result<(), SegmentError> {
        let size = clamp_size(size);

        if self.mapping.is_some() {
            debug!("Re-initializing segment '{}' as '{}'", self.name, name);
            self.close();
        }
        self.already_existed = false;

        if name.is_empty() {
            return Err(SegmentError::invalid_argument(
                "name",
                "Segment name cannot be empty",
            ));
        }

        let request = MappingRequest {
            size,
            permissions: self.permissions,
            create: self.create,
            writable: self.writable,
        };

        let Opened {
            handle,
            already_existed,
        } = match self.backend.open(name, &request) {
            Ok(opened) => opened,
            Err(e) => {
                warn!("Failed to open mapping '{}': {}", name, e);
                return Err(SegmentError::create_failed(name, e));
            }
        };

        let view = match self.backend.map_view(&handle, &request) {
            Ok(view) => view,
            Err(e) => {
                warn!("Failed to map view of '{}': {}", name, e);
                drop(handle);
                return Err(SegmentError::view_failed(name, e));
            }
        };

        debug!(
            "{} segment '{}' ({} bytes, {})",
            if already_existed { "Attached to" } else { "Created" },
            name,
            size,
            if self.writable { "read/write" } else { "read-only" }
        );
        self.name = name.to_string();
        self.size = size;
        self.already_existed = already_existed;
        self.mapping = Some(Mapping {
            view,
            handle,
            writable: self.writable,
        });
        Ok(())
    }

    /// Unmap the view and release the handle, in that order.
    ///
    /// A no-op when the segment is not initialized; safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(Mapping { view, handle, .. }) = self.mapping.take() {
            drop(view);
            drop(handle);
            debug!("Closed segment '{}'", self.name);

            if self.unlink_on_close {
                if let Err(e) = self.backend.remove(&self.name) {
                    warn!("Failed to remove '{}' on close: {}", self.name, e);
                }
            }
        }
    }

    /// Whether a mapping is currently held
    pub fn is_initialized(&self) -> bool {
        self.mapping.is_some()
    }

    /// Whether the last successful `init` attached to an existing mapping
    pub fn already_existed(&self) -> bool {
        self.already_existed
    }

    /// Name passed to the last `init`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Effective (clamped) size; zero before the first `init`
    pub fn size(&self) -> usize {
        self.size
    }

    /// Backend this segment maps through
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Whether closing removes the OS-level name
    pub fn set_unlink_on_close(&mut self, unlink: bool) {
        self.unlink_on_close = unlink;
    }

    /// Permissions used when `init` creates a new mapping
    pub fn set_permissions(&mut self, permissions: u32) {
        self.permissions = permissions;
    }

    /// Whether `init` may create an absent name; when false it only attaches
    pub fn set_create(&mut self, create: bool) {
        self.create = create;
    }

    /// Whether the next `init` maps with write access
    pub fn set_writable(&mut self, writable: bool) {
        self.writable = writable;
    }

    /// Whether the current mapping accepts writes
    pub fn is_writable(&self) -> bool {
        self.mapping.as_ref().map_or(false, |m| m.writable)
    }

    /// The mapped bytes, if initialized
    pub fn as_slice(&self) -> Option<&[u8]> {
        self.mapping.as_ref().map(|m| &m.view[..])
    }

    /// The mapped bytes for writing, if initialized with write access
    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        self.mapping.as_mut().and_then(|m| m.view.writable_bytes())
    }

    /// Flush the view to the backing store (no-op for pure shared memory)
    pub fn flush(&self) -> crate::Result<()> {
        match &self.mapping {
            Some(m) => self
                .backend
                .flush(&m.view)
                .map_err(|e| ShmError::from_io(e, "Failed to flush segment")),
            None => Err(crate::error::AccessError::NotInitialized.into()),
        }
    }
}

impl<B: MappingBackend> Drop for Segment<B> {
    fn drop(&mut self) {
        self.close();
    }
}
