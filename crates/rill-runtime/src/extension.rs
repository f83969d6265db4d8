//! Native extension loading
//!
//! A native extension is a shared library exporting one or both of two
//! entry points, named after the library file:
//!
//! - `rill_<name>_ext_init`: a function called with the loading VM
//! - `rill_ext_bytecode_<name>`: a serialized unit embedded in the library
//!
//! where `<name>` is the file name without directory and extension, with
//! `-` replaced by `_`.

use crate::error::LoadError;
use crate::loader::load_from_ptr;
use rill_engine::vm::ffi::{Library, LinkError};
use rill_engine::Vm;
use std::ffi::c_void;
use std::path::Path;
use tracing::info;

/// Signature of an extension's init entry point
pub type InitFn = unsafe extern "C" fn(*mut Vm);

/// Canonical name of an extension, derived from its path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionIdentity {
    name: String,
}

impl ExtensionIdentity {
    pub fn from_path(path: &str) -> Self {
        let base = path.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(path);
        let stem = match base.rfind('.') {
            Some(dot) => &base[..dot],
            None => base,
        };
        Self {
            name: stem.replace('-', "_"),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn init_symbol(&self) -> String {
        format!("rill_{}_ext_init", self.name)
    }

    pub fn blob_symbol(&self) -> String {
        format!("rill_ext_bytecode_{}", self.name)
    }
}

/// An opened library that symbols can be looked up in
pub trait NativeLibrary {
    /// Address of `name`, `None` when not exported
    fn symbol(&self, name: &str) -> Result<Option<*mut c_void>, LinkError>;
}

/// Opens shared libraries
pub trait DynamicLinker {
    fn open(&self, path: &Path) -> Result<Box<dyn NativeLibrary>, LinkError>;
}

/// The operating system's dynamic linker
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformLinker;

impl DynamicLinker for PlatformLinker {
    fn open(&self, path: &Path) -> Result<Box<dyn NativeLibrary>, LinkError> {
        Ok(Box::new(Library::open(path)?))
    }
}

impl NativeLibrary for Library {
    fn symbol(&self, name: &str) -> Result<Option<*mut c_void>, LinkError> {
        Library::symbol(self, name)
    }
}

/// Open the library at `path`, call its init entry point and run its
/// embedded bytecode, whichever of the two it exports.
///
/// The library is never closed.
pub fn load_library(vm: &mut Vm, path: &Path, linker: &dyn DynamicLinker) -> Result<(), LoadError> {
    let label = path.display().to_string();
    let link_error = |err: LinkError| LoadError::Link {
        path: label.clone(),
        message: err.to_string(),
    };

    let library = linker.open(path).map_err(link_error)?;
    let identity = ExtensionIdentity::from_path(&label);
    let init_name = identity.init_symbol();
    let blob_name = identity.blob_symbol();
    let init = library.symbol(&init_name).map_err(link_error)?;
    let blob = library.symbol(&blob_name).map_err(link_error)?;

    if init.is_none() && blob.is_none() {
        return Err(LoadError::MissingEntryPoints {
            init: init_name,
            blob: blob_name,
            path: label,
        });
    }

    if let Some(address) = init {
        info!(symbol = %init_name, library = %label, "attaching extension init");
        // SAFETY: an exported init symbol has the `InitFn` signature
        let init: InitFn = unsafe { std::mem::transmute::<*mut c_void, InitFn>(address) };
        let mark = vm.arena_save();
        unsafe { init(vm as *mut Vm) };
        vm.arena_restore(mark);
    }

    if let Some(address) = blob {
        info!(symbol = %blob_name, library = %label, "attaching extension bytecode");
        // SAFETY: an exported blob symbol is the start of a serialized unit
        unsafe { load_from_ptr(vm, address as *const u8, &label)? };
    }

    Ok(())
}
