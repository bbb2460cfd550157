//! FFI utilities and handle management

use std::{
    collections::HashMap,
    ffi::{c_char, CStr},
    sync::{Mutex, MutexGuard},
};

use log::warn;

use crate::segment::Segment;

// Global handle management
lazy_static::lazy_static! {
    pub static ref HANDLE_REGISTRY: Mutex<HandleRegistry> = Mutex::new(HandleRegistry::new());
}

/// Segments owned on behalf of C callers, keyed by handle id
#[derive(Debug)]
pub struct HandleRegistry {
    pub segments: HashMap<usize, Segment>,
    pub next_id: usize,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self {
            segments: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn store_segment(&mut self, segment: Segment) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.segments.insert(id, segment);
        id
    }

    pub fn get_segment(&self, id: usize) -> Option<&Segment> {
        self.segments.get(&id)
    }

    pub fn get_segment_mut(&mut self, id: usize) -> Option<&mut Segment> {
        self.segments.get_mut(&id)
    }

    pub fn remove_segment(&mut self, id: usize) -> Option<Segment> {
        self.segments.remove(&id)
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock the registry, recovering from a poisoned lock
pub fn registry() -> MutexGuard<'static, HandleRegistry> {
    HANDLE_REGISTRY
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Borrow a segment name passed from C.
///
/// Returns `None` for a null pointer or a name that is not UTF-8.
///
/// # Safety
///
/// A non-null `name` must point to a NUL-terminated string that stays valid
/// and unmodified for `'a`.
pub unsafe fn segment_name<'a>(name: *const c_char) -> Option<&'a str> {
    if name.is_null() {
        return None;
    }

    match CStr::from_ptr(name).to_str() {
        Ok(name) => Some(name),
        Err(e) => {
            warn!("Rejected segment name: {}", e);
            None
        }
    }
}

/// Initialize logging from `RUST_LOG`; returns false if a logger was already set
#[no_mangle]
pub extern "C" fn shmseg_init_logging() -> bool {
    env_logger::try_init().is_ok()
}
