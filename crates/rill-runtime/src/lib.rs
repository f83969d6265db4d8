//! Rill Runtime
//!
//! Loads code into a running [`Vm`] after start-up, from three sources:
//!
//! - source text, compiled in an isolated VM and handed over through a
//!   scratch file ([`loader::load_source`])
//! - serialized bytecode, from a stream, a file or memory ([`loader`])
//! - native shared libraries exporting an init function and/or an embedded
//!   bytecode blob ([`extension::load_library`])
//!
//! [`kernel::register`] exposes these to scripts together with `load` and
//! `require`.

#![warn(rust_2018_idioms)]

pub mod compile;
pub mod error;
pub mod extension;
pub mod kernel;
pub mod loader;
pub mod options;
pub mod resolve;
pub mod scratch;

pub use error::LoadError;
pub use extension::{ExtensionIdentity, InitFn};
pub use kernel::Kernel;
pub use options::{OptionsError, RuntimeOptions};
pub use scratch::{ScratchFile, ScratchProvider, TempScratch};

use rill_engine::Vm;

/// Create a VM configured by `options` with the loading kernel installed
pub fn create_vm(options: &RuntimeOptions) -> Vm {
    let mut vm = Vm::with_options(options.vm_options());
    kernel::register(&mut vm, options);
    vm
}
