//! Native extension fixture
//!
//! Exports both extension entry points for the name `fixture_ext`. The
//! built library has to be copied to `fixture-ext.<suffix>` before loading so
//! that the loader derives that name from the file.

use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

include!(concat!(env!("OUT_DIR"), "/fixture_len.rs"));

static INIT_CALLS: AtomicUsize = AtomicUsize::new(0);
static LAST_VM: AtomicPtr<c_void> = AtomicPtr::new(ptr::null_mut());

/// Init entry point; records the VM it was handed
///
/// # Safety
///
/// Never dereferences `vm`.
#[no_mangle]
pub unsafe extern "C" fn rill_fixture_ext_ext_init(vm: *mut c_void) {
    INIT_CALLS.fetch_add(1, Ordering::SeqCst);
    LAST_VM.store(vm, Ordering::SeqCst);
}

/// Bytecode entry point
#[no_mangle]
#[allow(non_upper_case_globals)]
pub static rill_ext_bytecode_fixture_ext: [u8; BLOB_LEN] =
    *include_bytes!(concat!(env!("OUT_DIR"), "/fixture.rbc"));

/// Number of times the init entry point has run in this process
#[no_mangle]
pub extern "C" fn rill_fixture_ext_init_calls() -> usize {
    INIT_CALLS.load(Ordering::SeqCst)
}

/// VM pointer passed to the most recent init call
#[no_mangle]
pub extern "C" fn rill_fixture_ext_last_vm() -> *mut c_void {
    LAST_VM.load(Ordering::SeqCst)
}
