//! Native extension entry points through a simulated linker

use super::harness::{compile_blob, FakeLibrary, FakeLinker};
use rill_engine::vm::ClassId;
use rill_engine::{Value, Vm, VmError};
use rill_runtime::extension::load_library;
use rill_runtime::LoadError;
use std::cell::Cell;
use std::path::Path;

thread_local! {
    static INIT_CALLS: Cell<usize> = Cell::new(0);
    static INIT_VM: Cell<usize> = Cell::new(0);
}

// ============================================================================
// Init functions
// ============================================================================

unsafe extern "C" fn counting_init(vm: *mut Vm) {
    INIT_CALLS.with(|calls| calls.set(calls.get() + 1));
    INIT_VM.with(|seen| seen.set(vm as usize));
    let vm = &mut *vm;
    vm.define_kernel_method("native_answer", |_, _, _| Ok(Value::Int(42)));
    let marker = vm.new_string("initialized");
    vm.set_global("native_state", marker);
}

fn init_calls() -> usize {
    INIT_CALLS.with(|calls| calls.get())
}

fn init_vm() -> usize {
    INIT_VM.with(|seen| seen.get())
}

// ============================================================================
// Symbol probing
// ============================================================================

#[test]
fn test_probes_exactly_the_derived_symbols() {
    let library = FakeLibrary::new().with_init("rill_foo_bar_ext_init", counting_init);
    let linker = FakeLinker::new().with_library("foo-bar.so", library.clone());
    let mut vm = Vm::new();

    load_library(&mut vm, Path::new("/opt/ext/foo-bar.so"), &linker).unwrap();

    assert_eq!(
        library.probes(),
        vec!["rill_foo_bar_ext_init", "rill_ext_bytecode_foo_bar"]
    );
}

#[test]
fn test_neither_symbol_is_an_error_naming_both() {
    let library = FakeLibrary::new().with_init("rill_other_ext_init", counting_init);
    let linker = FakeLinker::new().with_library("foo-bar.so", library);
    let mut vm = Vm::new();

    let err = load_library(&mut vm, Path::new("/opt/ext/foo-bar.so"), &linker).unwrap_err();

    assert_eq!(
        err.to_string(),
        "failed to attach rill_foo_bar_ext_init or rill_ext_bytecode_foo_bar in library /opt/ext/foo-bar.so"
    );
    assert_eq!(init_calls(), 0);
    let raised = err.into_vm_error(&mut vm);
    assert_eq!(raised.exception().unwrap().class, ClassId::LOAD_ERROR);
}

// ============================================================================
// Entry points
// ============================================================================

#[test]
fn test_init_only() {
    let library = FakeLibrary::new().with_init("rill_native_ext_init", counting_init);
    let linker = FakeLinker::new().with_library("native.so", library);
    let mut vm = Vm::new();
    let arena = vm.arena_len();

    load_library(&mut vm, Path::new("native.so"), &linker).unwrap();

    assert_eq!(init_calls(), 1);
    assert_eq!(init_vm(), &mut vm as *mut Vm as usize);
    assert_eq!(vm.eval("native_answer()").unwrap(), Value::Int(42));
    assert_eq!(vm.global("native_state"), Some(Value::from("initialized")));
    assert_eq!(vm.arena_len(), arena);
}

#[test]
fn test_blob_only() {
    let blob = compile_blob("let blob_runs = blob_runs_before();");
    let library = FakeLibrary::new().with_blob("rill_ext_bytecode_data", blob);
    let linker = FakeLinker::new().with_library("data.dylib", library);
    let mut vm = Vm::new();
    vm.define_kernel_method("blob_runs_before", |vm, _, _| {
        let seen = vm.global("blob_seen").unwrap_or(Value::Int(0));
        let next = match seen {
            Value::Int(n) => n + 1,
            _ => 1,
        };
        vm.set_global("blob_seen", Value::Int(next));
        Ok(Value::Int(next))
    });

    load_library(&mut vm, Path::new("/libs/data.dylib"), &linker).unwrap();

    assert_eq!(init_calls(), 0);
    assert_eq!(vm.global("blob_runs"), Some(Value::Int(1)));
    assert_eq!(vm.global("blob_seen"), Some(Value::Int(1)));
}

#[test]
fn test_init_runs_before_blob() {
    let blob = compile_blob("let combined = native_answer() + 1;");
    let library = FakeLibrary::new()
        .with_init("rill_both_ext_init", counting_init)
        .with_blob("rill_ext_bytecode_both", blob);
    let linker = FakeLinker::new().with_library("both.so", library);
    let mut vm = Vm::new();

    load_library(&mut vm, Path::new("both.so"), &linker).unwrap();

    assert_eq!(init_calls(), 1);
    assert_eq!(vm.global("combined"), Some(Value::Int(43)));
}

#[test]
fn test_blob_exception_propagates() {
    let blob = compile_blob("raise \"bad extension\";");
    let library = FakeLibrary::new().with_blob("rill_ext_bytecode_bad", blob);
    let linker = FakeLinker::new().with_library("bad.so", library);
    let mut vm = Vm::new();

    match load_library(&mut vm, Path::new("bad.so"), &linker) {
        Err(LoadError::Vm(VmError::Raised(exc))) => assert_eq!(exc.message, "bad extension"),
        other => panic!("expected the blob's exception, got {:?}", other),
    }
}

#[test]
fn test_open_failure_is_runtime_error() {
    let linker = FakeLinker::new();
    let mut vm = Vm::new();

    let err = load_library(&mut vm, Path::new("/nowhere/missing.so"), &linker).unwrap_err();

    assert!(matches!(err, LoadError::Link { .. }));
    let raised = err.into_vm_error(&mut vm);
    let exception = raised.exception().unwrap();
    assert_eq!(exception.class, ClassId::RUNTIME_ERROR);
    assert!(exception.message.contains("cannot open shared object file"));
    assert!(exception.message.ends_with("-- /nowhere/missing.so"));
}
