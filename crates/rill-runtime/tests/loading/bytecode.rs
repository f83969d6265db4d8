//! Loading serialized bytecode from streams and files

use super::harness::compile_bytes;
use rill_engine::compiler::{Opcode, Unit};
use rill_engine::vm::ClassId;
use rill_engine::{CompileContext, Value, Vm, VmError, VmOptions};
use rill_runtime::compile::compile_to_writer;
use rill_runtime::loader::{load_file, load_from_reader};
use rill_runtime::LoadError;
use std::fs::File;

const PROGRAM: &str = r#"
    fn area(w, h) { w * h }
    let total = 0;
    let i = 1;
    while i <= 3 { total = total + area(i, 2); i = i + 1; }
    total
"#;

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn test_round_trip_matches_direct_execution() {
    let mut direct = Vm::new();
    let expected = direct.eval(PROGRAM).unwrap();

    let mut bytes = Vec::new();
    compile_to_writer(PROGRAM, Some("area.rill"), &mut bytes).unwrap();
    let mut loaded = Vm::new();
    let value = load_from_reader(&mut loaded, &mut bytes.as_slice(), "area.rill").unwrap();

    assert_eq!(expected, Value::Int(12));
    assert_eq!(value, expected);
    assert_eq!(loaded.global("total"), direct.global("total"));
    assert_eq!(loaded.global("i"), direct.global("i"));
    assert_eq!(loaded.eval("area(3, 3)").unwrap(), direct.eval("area(3, 3)").unwrap());
}

#[test]
fn test_load_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prog.rbc");
    let mut file = File::create(&path).unwrap();
    compile_to_writer("let from_file = \"ok\"; from_file", None, &mut file).unwrap();
    drop(file);

    let mut vm = Vm::new();
    assert_eq!(load_file(&mut vm, &path).unwrap(), Value::from("ok"));
    assert_eq!(vm.global("from_file"), Some(Value::from("ok")));
}

// ============================================================================
// Legacy units
// ============================================================================

#[test]
fn test_legacy_stop_returns_nil_and_vm_continues() {
    let mut unit = Vm::new()
        .compile_source("let legacy = 1;", &CompileContext::new())
        .unwrap();
    assert_eq!(unit.code.pop(), Some(Opcode::Return.to_u8()));
    unit.code.push(Opcode::Stop.to_u8());
    let bytes = unit.encode();

    let mut vm = Vm::new();
    let value = load_from_reader(&mut vm, &mut bytes.as_slice(), "legacy.rbc").unwrap();

    assert_eq!(value, Value::Nil);
    assert_eq!(vm.global("legacy"), Some(Value::Int(1)));
    assert_eq!(vm.eval("legacy + 1").unwrap(), Value::Int(2));
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_truncated_file_is_load_error() {
    let mut bytes = compile_bytes("1 + 2");
    bytes.truncate(bytes.len() - 3);

    let mut vm = Vm::new();
    let err = load_from_reader(&mut vm, &mut bytes.as_slice(), "short.rbc").unwrap_err();
    assert!(matches!(err, LoadError::Malformed { .. }));

    let raised = err.into_vm_error(&mut vm);
    let exception = raised.exception().unwrap();
    assert_eq!(exception.class, ClassId::LOAD_ERROR);
    assert_eq!(exception.message, "can't load file -- short.rbc");
}

#[test]
fn test_header_declaring_huge_length_is_load_error() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"RILL");
    for word in [1u32, 0, 0xFFFF_FFF0, 0] {
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    bytes.extend_from_slice(b"tiny");

    let mut vm = Vm::new();
    let arena = vm.arena_len();
    let err = load_from_reader(&mut vm, &mut bytes.as_slice(), "huge.rbc").unwrap_err();
    assert!(matches!(err, LoadError::Malformed { .. }));
    assert_eq!(vm.arena_len(), arena);

    let raised = err.into_vm_error(&mut vm);
    assert_eq!(raised.exception().unwrap().class, ClassId::LOAD_ERROR);
}

#[test]
fn test_oversized_string_raises_no_memory() {
    let source = format!("let big = \"{}\";", "x".repeat(100));
    let bytes = compile_bytes(&source);

    let mut vm = Vm::with_options(VmOptions {
        max_string_len: 16,
        ..VmOptions::default()
    });
    match load_from_reader(&mut vm, &mut bytes.as_slice(), "big.rbc") {
        Err(LoadError::Vm(VmError::Raised(exc))) => assert_eq!(exc.class, ClassId::NO_MEMORY_ERROR),
        other => panic!("expected NoMemoryError, got {:?}", other),
    }
    assert_eq!(vm.global("big"), None);
}

#[test]
fn test_stream_position_after_unit() {
    let mut bytes = compile_bytes("let first = 1;");
    let first_len = bytes.len();
    bytes.extend(compile_bytes("let second = 2;"));

    let mut vm = Vm::new();
    let mut reader = bytes.as_slice();
    load_from_reader(&mut vm, &mut reader, "multi.rbc").unwrap();
    assert_eq!(reader.len(), bytes.len() - first_len);
    load_from_reader(&mut vm, &mut reader, "multi.rbc").unwrap();

    assert_eq!(vm.global("first"), Some(Value::Int(1)));
    assert_eq!(vm.global("second"), Some(Value::Int(2)));
    assert!(Unit::decode(&bytes).is_err());
}
