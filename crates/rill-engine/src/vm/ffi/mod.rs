//! Native extension support
//!
//! Platform dynamic linking used to attach compiled extensions to a VM.

pub mod loader;

pub use loader::{LinkError, Library};
