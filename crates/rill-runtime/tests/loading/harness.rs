//! Shared fixtures: recording scratch providers and a fake dynamic linker

use rill_engine::vm::ffi::LinkError;
use rill_engine::{CompileContext, Vm};
use rill_runtime::extension::{DynamicLinker, NativeLibrary};
use rill_runtime::{RuntimeOptions, ScratchFile, ScratchProvider, TempScratch};
use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::c_void;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

// ============================================================================
// Options
// ============================================================================

/// Options that search and scratch inside `dir` only
pub fn options_in(dir: &Path) -> RuntimeOptions {
    RuntimeOptions {
        load_path: vec![dir.to_path_buf()],
        scratch_dir: Some(dir.to_path_buf()),
        ..RuntimeOptions::default()
    }
}

/// Number of entries directly inside `dir`
pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

/// Compile `source` to serialized bytecode
pub fn compile_bytes(source: &str) -> Vec<u8> {
    let unit = Vm::new()
        .compile_source(source, &CompileContext::new())
        .unwrap();
    unit.encode()
}

/// Compile `source` to a blob that lives for the rest of the process
pub fn compile_blob(source: &str) -> &'static [u8] {
    Box::leak(compile_bytes(source).into_boxed_slice())
}

// ============================================================================
// Scratch providers
// ============================================================================

/// Temp scratch files whose paths are remembered
#[derive(Clone)]
pub struct RecordingScratch {
    inner: TempScratch,
    pub paths: Rc<RefCell<Vec<PathBuf>>>,
}

impl RecordingScratch {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            inner: TempScratch::in_dir(dir),
            paths: Rc::default(),
        }
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.paths.borrow().clone()
    }
}

impl ScratchProvider for RecordingScratch {
    fn acquire(&self) -> io::Result<ScratchFile> {
        let file = self.inner.acquire()?;
        self.paths.borrow_mut().push(file.path().to_path_buf());
        Ok(file)
    }
}

/// A provider that can never create a file
pub struct FailingScratch;

impl ScratchProvider for FailingScratch {
    fn acquire(&self) -> io::Result<ScratchFile> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "no scratch space"))
    }
}

// ============================================================================
// Fake dynamic linker
// ============================================================================

/// One simulated shared library
#[derive(Clone, Default)]
pub struct FakeLibrary {
    symbols: HashMap<String, usize>,
    probes: Rc<RefCell<Vec<String>>>,
}

impl FakeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_init(mut self, name: &str, init: rill_runtime::InitFn) -> Self {
        self.symbols.insert(name.to_string(), init as usize);
        self
    }

    pub fn with_blob(mut self, name: &str, blob: &'static [u8]) -> Self {
        self.symbols.insert(name.to_string(), blob.as_ptr() as usize);
        self
    }

    /// Symbol names looked up so far
    pub fn probes(&self) -> Vec<String> {
        self.probes.borrow().clone()
    }
}

impl NativeLibrary for FakeLibrary {
    fn symbol(&self, name: &str) -> Result<Option<*mut c_void>, LinkError> {
        self.probes.borrow_mut().push(name.to_string());
        Ok(self.symbols.get(name).map(|&address| address as *mut c_void))
    }
}

/// Resolves library paths by file name to [`FakeLibrary`] values
#[derive(Clone, Default)]
pub struct FakeLinker {
    libraries: HashMap<String, FakeLibrary>,
}

impl FakeLinker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library(mut self, file_name: &str, library: FakeLibrary) -> Self {
        self.libraries.insert(file_name.to_string(), library);
        self
    }
}

impl DynamicLinker for FakeLinker {
    fn open(&self, path: &Path) -> Result<Box<dyn NativeLibrary>, LinkError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match self.libraries.get(&name) {
            Some(library) => Ok(Box::new(library.clone())),
            None => Err(LinkError::Open {
                path: path.display().to_string(),
                message: format!(
                    "{}: cannot open shared object file: No such file or directory",
                    path.display()
                ),
            }),
        }
    }
}
