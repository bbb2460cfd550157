//! Configuration types for shared memory segments

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::MAX_SEGMENT_SIZE;
use crate::error::SegmentError;

/// Where the named mapping lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backing {
    /// POSIX shared memory object (`shm_open`)
    Shm,
    /// Regular file named after the segment inside `dir`
    File { dir: PathBuf },
}

impl Default for Backing {
    fn default() -> Self {
        Self::Shm
    }
}

impl Backing {
    /// Get a human-readable name for the backing
    pub fn name(&self) -> &'static str {
        match self {
            Backing::Shm => "shm",
            Backing::File { .. } => "file",
        }
    }
}

/// Configuration for creating or attaching a segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Name shared by every process attaching to the segment
    pub name: String,
    /// Requested size in bytes; clamped by [`clamp_size`]
    pub size: i64,
    /// Backing for the named mapping
    pub backing: Backing,
    /// Unix permissions for newly created objects
    pub permissions: u32,
    /// Create the name when absent; when false, only attach to an existing one
    pub create: bool,
    /// Map with write access; a read-only segment rejects writes
    pub writable: bool,
    /// Remove the OS-level name when this handle closes
    pub unlink_on_close: bool,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            size: MAX_SEGMENT_SIZE as i64,
            backing: Backing::default(),
            permissions: 0o600,
            create: true,
            writable: true,
            unlink_on_close: false,
        }
    }
}

impl SegmentConfig {
    /// Create a new segment configuration
    pub fn new(name: impl Into<String>, size: i64) -> Self {
        Self {
            name: name.into(),
            size,
            ..Default::default()
        }
    }

    /// Set the backing
    pub fn with_backing(mut self, backing: Backing) -> Self {
        self.backing = backing;
        self
    }

    /// Back the segment with a file inside `dir`
    pub fn with_file_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backing = Backing::File { dir: dir.into() };
        self
    }

    /// Set the permissions for newly created objects
    pub fn with_permissions(mut self, permissions: u32) -> Self {
        self.permissions = permissions;
        self
    }

    /// Set whether a missing name is created
    pub fn with_create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    /// Set whether the segment is mapped with write access
    pub fn with_writable(mut self, writable: bool) -> Self {
        self.writable = writable;
        self
    }

    /// Attach to an existing name only, mapped read-only
    pub fn observer(self) -> Self {
        self.with_create(false).with_writable(false)
    }

    /// Set whether closing this handle removes the name
    pub fn with_unlink_on_close(mut self, unlink: bool) -> Self {
        self.unlink_on_close = unlink;
        self
    }

    /// Size the mapping will actually have
    pub fn effective_size(&self) -> usize {
        clamp_size(self.size)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), SegmentError> {
        if self.name.is_empty() {
            return Err(SegmentError::invalid_argument(
                "name",
                "Segment name cannot be empty",
            ));
        }

        if self.name.contains('\0') {
            return Err(SegmentError::invalid_argument(
                "name",
                "Segment name contains null bytes",
            ));
        }

        if self.permissions & !0o777 != 0 {
            return Err(SegmentError::invalid_argument(
                "permissions",
                format!("{:#o} is not a valid permission mask", self.permissions),
            ));
        }

        Ok(())
    }
}

/// Clamp a requested size into `(0, MAX_SEGMENT_SIZE]`.
///
/// Anything non-positive or above the ceiling becomes exactly the ceiling.
pub fn clamp_size(size: i64) -> usize {
    if size <= 0 || size > MAX_SEGMENT_SIZE as i64 {
        MAX_SEGMENT_SIZE
    } else {
        size as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_size() {
        assert_eq!(clamp_size(0), MAX_SEGMENT_SIZE);
        assert_eq!(clamp_size(-1), MAX_SEGMENT_SIZE);
        assert_eq!(clamp_size(i64::MIN), MAX_SEGMENT_SIZE);
        assert_eq!(clamp_size(10_000_000), 8_388_608);
        assert_eq!(clamp_size(i64::MAX), MAX_SEGMENT_SIZE);
        assert_eq!(clamp_size(1), 1);
        assert_eq!(clamp_size(1024), 1024);
        assert_eq!(clamp_size(MAX_SEGMENT_SIZE as i64), MAX_SEGMENT_SIZE);
        assert_eq!(clamp_size(MAX_SEGMENT_SIZE as i64 + 1), MAX_SEGMENT_SIZE);
    }

    #[test]
    fn test_config_defaults() {
        let config = SegmentConfig::default();
        assert_eq!(config.backing, Backing::Shm);
        assert_eq!(config.permissions, 0o600);
        assert!(config.create);
        assert!(config.writable);
        assert!(!config.unlink_on_close);
        assert_eq!(config.effective_size(), MAX_SEGMENT_SIZE);
    }

    #[test]
    fn test_config_builder() {
        let config = SegmentConfig::new("demo", 1024)
            .with_file_dir("/tmp")
            .with_permissions(0o644)
            .with_unlink_on_close(true);

        assert_eq!(config.name, "demo");
        assert_eq!(config.effective_size(), 1024);
        assert_eq!(config.backing.name(), "file");
        assert_eq!(config.permissions, 0o644);
        assert!(config.unlink_on_close);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SegmentConfig::default();
        assert_eq!(config.validate().unwrap_err().code(), 1);

        config.name = "a\0b".to_string();
        assert!(config.validate().is_err());

        config.name = "demo".to_string();
        assert!(config.validate().is_ok());

        config.permissions = 0o7777;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_access_modes() {
        let config = SegmentConfig::new("demo", 64).with_writable(false);
        assert!(config.create);
        assert!(!config.writable);

        let config = SegmentConfig::new("demo", 64).observer();
        assert!(!config.create);
        assert!(!config.writable);
        assert!(config.validate().is_ok());
    }
}
