//! Integration tests for the Rill loading subsystem
//!
//! These tests drive real compilation, serialization, scratch files and
//! execution. Native libraries are mostly simulated by an in-process linker
//! whose symbols are real `extern "C"` functions and serialized blobs; the
//! `platform` tests open the shared library built from `rill-ext-fixture`.

mod harness;
mod bytecode;
mod extensions;
mod kernel;
mod platform;
mod source;

pub use harness::*;
