//! Scratch files
//!
//! A scratch file carries compiled bytecode from the compiler back into the
//! loader. Each one has a unique name, owner-only permissions, and is
//! removed when released or dropped.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Name prefix of every scratch file
pub const SCRATCH_PREFIX: &str = "tmp.";

/// Source of scratch files
pub trait ScratchProvider {
    /// Create a new, empty scratch file open for reading and writing
    fn acquire(&self) -> io::Result<ScratchFile>;
}

/// Scratch files from the platform temp-file facility
#[derive(Debug, Clone, Default)]
pub struct TempScratch {
    dir: Option<PathBuf>,
}

impl TempScratch {
    /// Create scratch files in the system temp directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Create scratch files in `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }
}

impl ScratchProvider for TempScratch {
    fn acquire(&self) -> io::Result<ScratchFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let file = match &self.dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        ScratchFile::new(file)
    }
}

/// A temporary file owned by one load operation
#[derive(Debug)]
pub struct ScratchFile {
    file: NamedTempFile,
}

impl ScratchFile {
    /// Take ownership of a temp file, restricting it to the owner
    pub fn new(file: NamedTempFile) -> io::Result<Self> {
        #[cfg(unix)]
        {
            use std::fs::Permissions;
            use std::os::unix::fs::PermissionsExt;
            file.as_file().set_permissions(Permissions::from_mode(0o600))?;
        }
        debug!(path = %file.path().display(), "acquired scratch file");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Close and delete the file
    pub fn release(self) {
        let path = self.file.path().to_path_buf();
        match self.file.close() {
            Ok(()) => debug!(path = %path.display(), "released scratch file"),
            Err(err) => warn!(path = %path.display(), error = %err, "failed to remove scratch file"),
        }
    }
}

impl Read for ScratchFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for ScratchFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for ScratchFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}
