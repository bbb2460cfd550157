//! OS mapping backends
//!
//! A backend knows how to open a named mapping object (creating it when
//! asked), map a view of it, and remove the name. Dropping a view unmaps it
//! and dropping a handle releases it, so a [`Segment`](super::Segment) only has
//! to drop them in the right order.

use std::{
    fmt,
    fs::{self, File, OpenOptions},
    io,
    ops::Deref,
    os::unix::fs::OpenOptionsExt,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use log::debug;
use memmap2::{Mmap, MmapMut, MmapOptions};
use nix::{
    errno::Errno,
    fcntl::OFlag,
    sys::{mman, stat::Mode},
};

use super::config::Backing;

/// Attempts made when a name vanishes between the exclusive create and the plain open.
const OPEN_RETRIES: usize = 3;

/// How long an attacher waits for the creator to size a fresh object
const SIZE_WAIT: Duration = Duration::from_millis(250);
const SIZE_POLL: Duration = Duration::from_micros(200);

/// What a [`MappingBackend`] is asked to open and how to map it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingRequest {
    /// Bytes to map; also the size of a newly created object
    pub size: usize,
    /// Unix permissions for a newly created object
    pub permissions: u32,
    /// Create the name when absent; otherwise opening an absent name fails
    pub create: bool,
    /// Map with write access
    pub writable: bool,
}

impl MappingRequest {
    /// Create-or-open with read/write access
    pub fn read_write(size: usize) -> Self {
        Self {
            size,
            permissions: 0o600,
            create: true,
            writable: true,
        }
    }
}

/// Outcome of an open request
#[derive(Debug)]
pub struct Opened<H> {
    /// Handle owning the OS mapping object
    pub handle: H,
    /// True when the name was already present before this call
    pub already_existed: bool,
}

/// A mapped view; only writable views hand out mutable bytes
pub trait SegmentView: Deref<Target = [u8]> + Send {
    /// The bytes for writing, or `None` for a read-only view
    fn writable_bytes(&mut self) -> Option<&mut [u8]>;
}

/// View produced by the shm and file backends
pub enum MappedView {
    ReadWrite(MmapMut),
    ReadOnly(Mmap),
}

impl fmt::Debug for MappedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self {
            Self::ReadWrite(_) => "ReadWrite",
            Self::ReadOnly(_) => "ReadOnly",
        };
        f.debug_struct("MappedView")
            .field("mode", &mode)
            .field("len", &self.len())
            .finish()
    }
}

impl Deref for MappedView {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::ReadWrite(map) => &map[..],
            Self::ReadOnly(map) => &map[..],
        }
    }
}

impl SegmentView for MappedView {
    fn writable_bytes(&mut self) -> Option<&mut [u8]> {
        match self {
            Self::ReadWrite(map) => Some(&mut map[..]),
            Self::ReadOnly(_) => None,
        }
    }
}

impl MappedView {
    /// Write dirty pages back to the backing object
    pub fn flush(&self) -> io::Result<()> {
        match self {
            Self::ReadWrite(map) => map.flush(),
            Self::ReadOnly(_) => Ok(()),
        }
    }
}

/// Capability to open, map and remove named mappings
pub trait MappingBackend: fmt::Debug + Send {
    /// Owned OS handle; released on drop
    type Handle: Send;
    /// Process-local view; unmapped on drop
    type View: SegmentView;

    /// Open the named mapping, creating it with `request.size` bytes when
    /// `request.create` is set and the name is absent.
    ///
    /// `already_existed` must come from this call alone.
    fn open(&self, name: &str, request: &MappingRequest) -> io::Result<Opened<Self::Handle>>;

    /// Map the first `request.size` bytes of the mapping
    fn map_view(&self, handle: &Self::Handle, request: &MappingRequest) -> io::Result<Self::View>;

    /// Push the view to durable storage where the backing has any
    fn flush(&self, _view: &Self::View) -> io::Result<()> {
        Ok(())
    }

    /// Remove the OS-level name; existing views stay valid
    fn remove(&self, name: &str) -> io::Result<()>;
}

/// Current length of `file`, waiting while it is still zero.
///
/// A creator makes the object at length zero and sizes it in one step right
/// after, so an attacher racing the creator can see the empty object briefly.
fn await_sized(file: &File) -> io::Result<u64> {
    let deadline = Instant::now() + SIZE_WAIT;
    loop {
        let len = file.metadata()?.len();
        if len > 0 || Instant::now() >= deadline {
            return Ok(len);
        }
        thread::sleep(SIZE_POLL);
    }
}

/// Map `request.size` bytes of an open file-like object.
///
/// Refuses to map past the end of the object, which would fault on access.
fn map_file(file: &File, request: &MappingRequest) -> io::Result<MappedView> {
    let len = await_sized(file)?;
    if len < request.size as u64 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("mapping holds {} bytes, {} requested", len, request.size),
        ));
    }

    let mut options = MmapOptions::new();
    options.len(request.size);
    if request.writable {
        Ok(MappedView::ReadWrite(unsafe { options.map_mut(file)? }))
    } else {
        Ok(MappedView::ReadOnly(unsafe { options.map(file)? }))
    }
}

/// POSIX shared memory objects named through `shm_open`
#[derive(Debug, Clone, Copy, Default)]
pub struct ShmBackend;

impl ShmBackend {
    /// OS name for a segment name: a single leading slash
    pub fn object_name(name: &str) -> String {
        if name.starts_with('/') {
            name.to_string()
        } else {
            format!("/{}", name)
        }
    }

    fn open_flags(writable: bool) -> OFlag {
        if writable {
            OFlag::O_RDWR
        } else {
            OFlag::O_RDONLY
        }
    }
}

impl MappingBackend for ShmBackend {
    type Handle = File;
    type View = MappedView;

    fn open(&self, name: &str, request: &MappingRequest) -> io::Result<Opened<File>> {
        let object = Self::object_name(name);
        let access = Self::open_flags(request.writable);

        if !request.create {
            let fd = mman::shm_open(object.as_str(), access, Mode::empty())?;
            debug!("Opened existing shm object {}", object);
            return Ok(Opened {
                handle: File::from(fd),
                already_existed: true,
            });
        }

        let mode = Mode::from_bits_truncate(request.permissions as nix::libc::mode_t);
        for _ in 0..OPEN_RETRIES {
            match mman::shm_open(
                object.as_str(),
                OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR,
                mode,
            ) {
                Ok(fd) => {
                    let file = File::from(fd);
                    if let Err(e) = file.set_len(request.size as u64) {
                        let _ = mman::shm_unlink(object.as_str());
                        return Err(e);
                    }
                    debug!("Created shm object {} ({} bytes)", object, request.size);
                    return Ok(Opened {
                        handle: file,
                        already_existed: false,
                    });
                }
                Err(Errno::EEXIST) => match mman::shm_open(object.as_str(), access, Mode::empty()) {
                    Ok(fd) => {
                        debug!("Opened existing shm object {}", object);
                        return Ok(Opened {
                            handle: File::from(fd),
                            already_existed: true,
                        });
                    }
                    // Unlinked between the two calls
                    Err(Errno::ENOENT) => continue,
                    Err(e) => return Err(e.into()),
                },
                Err(e) => return Err(e.into()),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::Other,
            format!("{} kept disappearing during create-or-open", object),
        ))
    }

    fn map_view(&self, handle: &File, request: &MappingRequest) -> io::Result<MappedView> {
        map_file(handle, request)
    }

    fn remove(&self, name: &str) -> io::Result<()> {
        mman::shm_unlink(Self::object_name(name).as_str()).map_err(io::Error::from)
    }
}

/// Regular files named after the segment inside a directory
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Create a backend rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the backing files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Backing file path for a segment name
    pub fn path_for(&self, name: &str) -> io::Result<PathBuf> {
        if name.contains('/') || name == "." || name == ".." {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("'{}' is not usable as a file name", name),
            ));
        }
        Ok(self.dir.join(format!("shmseg_{}", name)))
    }

    fn open_existing(path: &Path, writable: bool) -> io::Result<File> {
        OpenOptions::new().read(true).write(writable).open(path)
    }
}

impl MappingBackend for FileBackend {
    type Handle = File;
    type View = MappedView;

    fn open(&self, name: &str, request: &MappingRequest) -> io::Result<Opened<File>> {
        let path = self.path_for(name)?;

        if !request.create {
            let file = Self::open_existing(&path, request.writable)?;
            debug!("Opened existing backing file {}", path.display());
            return Ok(Opened {
                handle: file,
                already_existed: true,
            });
        }

        for _ in 0..OPEN_RETRIES {
            match OpenOptions::new()
                .read(true)
                .write(true)
                .create_new(true)
                .mode(request.permissions)
                .open(&path)
            {
                Ok(file) => {
                    if let Err(e) = file.set_len(request.size as u64) {
                        let _ = fs::remove_file(&path);
                        return Err(e);
                    }
                    debug!(
                        "Created backing file {} ({} bytes)",
                        path.display(),
                        request.size
                    );
                    return Ok(Opened {
                        handle: file,
                        already_existed: false,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    match Self::open_existing(&path, request.writable) {
                        Ok(file) => {
                            debug!("Opened existing backing file {}", path.display());
                            return Ok(Opened {
                                handle: file,
                                already_existed: true,
                            });
                        }
                        Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                        Err(e) => return Err(e),
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::Other,
            format!("{} kept disappearing during create-or-open", path.display()),
        ))
    }

    fn map_view(&self, handle: &File, request: &MappingRequest) -> io::Result<MappedView> {
        map_file(handle, request)
    }

    fn flush(&self, view: &MappedView) -> io::Result<()> {
        view.flush()
    }

    fn remove(&self, name: &str) -> io::Result<()> {
        fs::remove_file(self.path_for(name)?)
    }
}

/// Backend selected from a [`Backing`] at runtime
#[derive(Debug, Clone)]
pub enum Backend {
    Shm(ShmBackend),
    File(FileBackend),
}

impl Default for Backend {
    fn default() -> Self {
        Self::Shm(ShmBackend)
    }
}

impl From<&Backing> for Backend {
    fn from(backing: &Backing) -> Self {
        match backing {
            Backing::Shm => Self::Shm(ShmBackend),
            Backing::File { dir } => Self::File(FileBackend::new(dir.clone())),
        }
    }
}

impl MappingBackend for Backend {
    type Handle = File;
    type View = MappedView;

    fn open(&self, name: &str, request: &MappingRequest) -> io::Result<Opened<File>> {
        match self {
            Self::Shm(b) => b.open(name, request),
            Self::File(b) => b.open(name, request),
        }
    }

    fn map_view(&self, handle: &File, request: &MappingRequest) -> io::Result<MappedView> {
        match self {
            Self::Shm(b) => b.map_view(handle, request),
            Self::File(b) => b.map_view(handle, request),
        }
    }

    fn flush(&self, view: &MappedView) -> io::Result<()> {
        match self {
            Self::Shm(b) => b.flush(view),
            Self::File(b) => b.flush(view),
        }
    }

    fn remove(&self, name: &str) -> io::Result<()> {
        match self {
            Self::Shm(b) => b.remove(name),
            Self::File(b) => b.remove(name),
        }
    }
}
