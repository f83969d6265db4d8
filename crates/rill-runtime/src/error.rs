//! Load error types

use rill_engine::compiler::ModuleError;
use rill_engine::vm::{ClassId, Vm, VmError};
use std::io;

/// Errors that can occur while loading code into a VM.
///
/// Bookkeeping failures of the loader carry fixed message templates. Errors
/// raised by the code being loaded travel in [`LoadError::Vm`] untouched.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Source text failed to compile
    #[error("can't load file -- {path}")]
    Compile {
        /// Path label given for the source
        path: String,
    },

    /// Bytecode could not be deserialized
    #[error("can't load file -- {path}")]
    Malformed {
        /// Path label of the stream or library
        path: String,
        /// What the reader rejected
        #[source]
        source: ModuleError,
    },

    /// Bytecode file could not be opened
    #[error("can't open file -- {path}")]
    OpenFile {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Scratch file could not be created, written or rewound
    #[error("scratch file: {0}")]
    Scratch(#[source] io::Error),

    /// Shared library could not be opened
    #[error("{message} -- {path}")]
    Link {
        path: String,
        /// Platform diagnostic
        message: String,
    },

    /// Shared library exports neither entry point
    #[error("failed to attach {init} or {blob} in library {path}")]
    MissingEntryPoints {
        init: String,
        blob: String,
        path: String,
    },

    /// No file matched during feature search
    #[error("cannot load such file -- {path}")]
    NotFound { path: String },

    /// An exception raised inside the VM
    #[error(transparent)]
    Vm(#[from] VmError),
}

impl LoadError {
    /// Class of the exception scripts see for this error
    pub fn exception_class(&self) -> Option<ClassId> {
        match self {
            LoadError::Vm(_) => None,
            LoadError::Scratch(_) => Some(ClassId::SYSTEM_CALL_ERROR),
            LoadError::Link { .. } => Some(ClassId::RUNTIME_ERROR),
            _ => Some(ClassId::LOAD_ERROR),
        }
    }

    /// Turn into a VM exception. Exceptions raised by loaded code come back
    /// as the same value.
    pub fn into_vm_error(self, vm: &mut Vm) -> VmError {
        match self {
            LoadError::Vm(err) => err,
            other => {
                let class = other.exception_class().unwrap_or(ClassId::LOAD_ERROR);
                vm.raise(class, other.to_string())
            }
        }
    }
}
