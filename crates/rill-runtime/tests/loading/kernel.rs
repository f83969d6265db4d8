//! Script-facing `load`, `require` and the low-level loader methods

use super::harness::{compile_blob, compile_bytes, entries, options_in, FakeLibrary, FakeLinker, RecordingScratch};
use rill_engine::vm::ClassId;
use rill_engine::{Value, Vm};
use rill_runtime::kernel::Kernel;
use rill_runtime::{create_vm, RuntimeOptions};
use std::fs;
use std::path::Path;

fn vm_in(dir: &Path) -> Vm {
    create_vm(&options_in(dir))
}

fn lib_dir() -> (tempfile::TempDir, tempfile::TempDir) {
    (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap())
}

// ============================================================================
// require
// ============================================================================

#[test]
fn test_require_twice_runs_once() {
    let (lib, scratch) = lib_dir();
    fs::write(lib.path().join("counter.rill"), "puts(\"loading counter\"); let loads = 1;").unwrap();
    let options = RuntimeOptions {
        load_path: vec![lib.path().to_path_buf()],
        scratch_dir: Some(scratch.path().to_path_buf()),
        ..RuntimeOptions::default()
    };
    let mut vm = create_vm(&options);
    let output = vm.capture_output();

    assert_eq!(vm.eval("require(\"counter\")").unwrap(), Value::Bool(true));
    assert_eq!(vm.eval("require(\"counter\")").unwrap(), Value::Bool(false));
    assert_eq!(vm.eval("require(\"counter.rill\")").unwrap(), Value::Bool(false));

    assert_eq!(output.contents(), "loading counter\n");
    assert_eq!(entries(scratch.path()), 0);
}

#[test]
fn test_require_bytecode_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("compiled.rbc"), compile_bytes("let compiled = true;")).unwrap();
    let mut vm = vm_in(dir.path());

    assert_eq!(vm.eval("require(\"compiled\")").unwrap(), Value::Bool(true));
    assert_eq!(vm.global("compiled"), Some(Value::Bool(true)));
}

#[test]
fn test_recursive_require_returns_false() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.rill"), "let inner = require(\"a\");").unwrap();
    let mut vm = vm_in(dir.path());

    assert_eq!(vm.eval("require(\"a\")").unwrap(), Value::Bool(true));
    assert_eq!(vm.global("inner"), Some(Value::Bool(false)));
}

#[test]
fn test_require_does_not_probe_shared_libraries() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("native.so"), "").unwrap();
    let mut vm = vm_in(dir.path());

    let err = vm.eval("require(\"native\")").unwrap_err();
    assert_eq!(err.exception().unwrap().message, "cannot load such file -- native");
}

#[test]
fn test_require_extensionless_file_is_source() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("helper"), "let helper_ran = true;").unwrap();
    let mut vm = Vm::new();
    Kernel::new(&options_in(dir.path()))
        .with_linker(FakeLinker::new())
        .install(&mut vm);

    assert_eq!(vm.eval("require(\"helper\")").unwrap(), Value::Bool(true));
    assert_eq!(vm.global("helper_ran"), Some(Value::Bool(true)));
    assert_eq!(vm.eval("require(\"helper\")").unwrap(), Value::Bool(false));
    assert_eq!(entries(dir.path()), 1);
}

// ============================================================================
// load
// ============================================================================

#[test]
fn test_load_always_runs() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("tick.rill"), "puts(\"tick\");").unwrap();
    let mut vm = vm_in(dir.path());
    let output = vm.capture_output();

    vm.eval("load(\"tick\"); load(\"tick\"); require(\"tick\");").unwrap();
    assert_eq!(output.contents(), "tick\ntick\ntick\n");
    assert_eq!(vm.eval("require(\"tick\")").unwrap(), Value::Bool(false));
}

#[test]
fn test_load_dispatches_shared_library() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("ext-mod.so"), "").unwrap();
    let blob = compile_blob("let from_extension = 99;");
    let library = FakeLibrary::new().with_blob("rill_ext_bytecode_ext_mod", blob);
    let linker = FakeLinker::new().with_library("ext-mod.so", library.clone());

    let mut vm = Vm::new();
    Kernel::new(&options_in(dir.path()))
        .with_linker(linker)
        .install(&mut vm);

    assert_eq!(vm.eval("load(\"ext-mod\")").unwrap(), Value::Bool(true));
    assert_eq!(vm.global("from_extension"), Some(Value::Int(99)));
    assert_eq!(library.probes().len(), 2);
}

#[test]
fn test_load_relative_path_skips_load_path() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("local.rill"), "let local = 1;").unwrap();
    let mut vm = vm_in(dir.path());

    let err = vm.eval("load(\"./local-does-not-exist\")").unwrap_err();
    assert_eq!(err.exception().unwrap().class, ClassId::LOAD_ERROR);

    let absolute = dir.path().join("local");
    let source = format!("load(\"{}\")", absolute.display());
    assert_eq!(vm.eval(&source).unwrap(), Value::Bool(true));
    assert_eq!(vm.global("local"), Some(Value::Int(1)));
}

// ============================================================================
// Low-level methods
// ============================================================================

#[test]
fn test_low_level_methods() {
    let dir = tempfile::tempdir().unwrap();
    let rbc = dir.path().join("low.rbc");
    fs::write(&rbc, compile_bytes("let low = \"bytecode\";")).unwrap();
    let mut vm = vm_in(dir.path());

    let source = format!(
        "__load_bytecode_file(\"{}\") && __load_source(\"let high = 2;\", \"high.rill\")",
        rbc.display()
    );
    assert_eq!(vm.eval(&source).unwrap(), Value::Bool(true));
    assert_eq!(vm.global("low"), Some(Value::from("bytecode")));
    assert_eq!(vm.global("high"), Some(Value::Int(2)));
}

#[test]
fn test_missing_bytecode_file_is_catchable() {
    let dir = tempfile::tempdir().unwrap();
    let mut vm = vm_in(dir.path());

    let source = r#"
        try { __load_bytecode_file("/definitely/not/here.rbc") }
        catch (e) { is_a(e, "ScriptError") && message(e) == "can't open file -- /definitely/not/here.rbc" }
    "#;
    assert_eq!(vm.eval(source).unwrap(), Value::Bool(true));
}

#[test]
fn test_load_source_through_recording_scratch() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = RecordingScratch::in_dir(dir.path());
    let mut vm = Vm::new();
    Kernel::new(&RuntimeOptions::default())
        .with_scratch(scratch.clone())
        .install(&mut vm);

    vm.eval("__load_source(\"1\"); __load_source(\"2\");").unwrap();

    let used = scratch.paths();
    assert_eq!(used.len(), 2);
    assert_ne!(used[0], used[1]);
    assert!(used.iter().all(|p| !p.exists()));
}

// ============================================================================
// Arena
// ============================================================================

#[test]
fn test_arena_unchanged_by_loads() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("strs.rill"), "let joined = \"a\" + \"b\" + \"c\";").unwrap();
    fs::write(dir.path().join("fails.rill"), "raise \"always\";").unwrap();
    let mut vm = vm_in(dir.path());
    let main = vm.main();

    let before = vm.arena_len();
    vm.call_method(&main, "require", &[Value::from("strs")]).unwrap();
    assert_eq!(vm.arena_len(), before);
    vm.call_method(&main, "load", &[Value::from("strs")]).unwrap();
    assert_eq!(vm.arena_len(), before);
    assert!(vm.call_method(&main, "load", &[Value::from("fails")]).is_err());
    assert_eq!(vm.arena_len(), before);
}
