//! Loading source text through scratch files

use super::harness::{entries, FailingScratch, RecordingScratch};
use rill_engine::vm::ClassId;
use rill_engine::{Value, Vm, VmError};
use rill_runtime::loader::load_source;
use rill_runtime::LoadError;

// ============================================================================
// Scratch lifecycle
// ============================================================================

#[test]
fn test_valid_source_runs_and_removes_scratch() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = RecordingScratch::in_dir(dir.path());
    let mut vm = Vm::new();

    let value = load_source(&mut vm, "fn double(x) { x * 2 }\ndouble(21)", Some("double.rill"), &scratch)
        .unwrap();

    assert_eq!(value, Value::Int(42));
    assert_eq!(vm.eval("double(5)").unwrap(), Value::Int(10));
    let used = scratch.paths();
    assert_eq!(used.len(), 1);
    assert!(!used[0].exists());
    assert_eq!(entries(dir.path()), 0);
}

#[test]
fn test_invalid_source_leaves_no_scratch() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = RecordingScratch::in_dir(dir.path());
    let mut vm = Vm::new();

    let err = load_source(&mut vm, "fn (", Some("broken.rill"), &scratch).unwrap_err();

    assert!(matches!(err, LoadError::Compile { ref path } if path == "broken.rill"));
    assert_eq!(scratch.paths().len(), 1);
    assert_eq!(entries(dir.path()), 0);
}

#[test]
fn test_runtime_error_leaves_no_scratch() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = RecordingScratch::in_dir(dir.path());
    let mut vm = Vm::new();

    let err = load_source(&mut vm, "1 / 0", None, &scratch).unwrap_err();

    match err {
        LoadError::Vm(VmError::Raised(exc)) => {
            assert_eq!(exc.class, ClassId::ZERO_DIVISION_ERROR);
            assert_eq!(exc.message, "divided by 0");
        }
        other => panic!("expected the script's exception, got {:?}", other),
    }
    assert_eq!(entries(dir.path()), 0);
}

#[test]
fn test_scratch_names_unique_across_calls() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = RecordingScratch::in_dir(dir.path());
    let mut vm = Vm::new();

    for i in 0..5 {
        load_source(&mut vm, &format!("let n{} = {};", i, i), None, &scratch).unwrap();
    }

    let mut used = scratch.paths();
    assert_eq!(used.len(), 5);
    used.sort();
    used.dedup();
    assert_eq!(used.len(), 5);
    assert_eq!(vm.global("n4"), Some(Value::Int(4)));
}

// ============================================================================
// Failure before compilation
// ============================================================================

#[test]
fn test_scratch_failure_leaves_vm_untouched() {
    let mut vm = Vm::new();
    let before = vm.arena_len();

    let err = load_source(&mut vm, "let touched = true;", None, &FailingScratch).unwrap_err();

    assert!(matches!(err, LoadError::Scratch(_)));
    assert_eq!(vm.global("touched"), None);
    assert_eq!(vm.arena_len(), before);

    let raised = err.into_vm_error(&mut vm);
    assert_eq!(raised.exception().unwrap().class, ClassId::SYSTEM_CALL_ERROR);
}

// ============================================================================
// Isolation
// ============================================================================

#[test]
fn test_compilation_does_not_touch_caller_vm() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = RecordingScratch::in_dir(dir.path());
    let mut vm = Vm::new();
    let output = vm.capture_output();

    let err = load_source(&mut vm, "puts(\"side effect\");\nlet x = ;", None, &scratch).unwrap_err();

    assert!(matches!(err, LoadError::Compile { .. }));
    assert_eq!(output.contents(), "");
    assert_eq!(err.to_string(), "can't load file -- -");
}

#[test]
fn test_output_happens_once_at_load_time() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = RecordingScratch::in_dir(dir.path());
    let mut vm = Vm::new();
    let output = vm.capture_output();

    load_source(&mut vm, "puts(\"loaded\");", Some("hello.rill"), &scratch).unwrap();

    assert_eq!(output.contents(), "loaded\n");
}
