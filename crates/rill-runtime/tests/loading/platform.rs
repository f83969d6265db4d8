//! Native extensions through the operating system's dynamic linker

use super::harness::options_in;
use rill_engine::vm::ffi::Library;
use rill_engine::{Value, Vm};
use rill_runtime::extension::{load_library, PlatformLinker};
use rill_runtime::create_vm;
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::ffi::c_void;
use std::fs;
use std::path::{Path, PathBuf};

/// Find the fixture library cargo built next to this test binary
fn built_fixture() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let deps = exe.parent()?;
    let prefix = format!("{}rill_ext_fixture", DLL_PREFIX);
    [deps, deps.parent()?]
        .iter()
        .filter_map(|dir| fs::read_dir(dir).ok())
        .flatten()
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            name.starts_with(&prefix) && name.ends_with(DLL_SUFFIX)
        })
        .max_by_key(|path| fs::metadata(path).and_then(|m| m.modified()).ok())
}

/// Copy the fixture to `fixture-ext.<suffix>` inside `dir`
fn install_fixture(dir: &Path) -> Option<PathBuf> {
    let Some(built) = built_fixture() else {
        eprintln!("Skipping test: rill-ext-fixture shared library not found. Build with 'cargo build -p rill-ext-fixture'");
        return None;
    };
    let target = dir.join(format!("fixture-ext{}", DLL_SUFFIX));
    fs::copy(&built, &target).unwrap();
    Some(target)
}

fn fixture_state(path: &Path) -> (usize, *mut c_void) {
    let library = Library::open(path).unwrap();
    let calls = library.symbol("rill_fixture_ext_init_calls").unwrap().unwrap();
    let last_vm = library.symbol("rill_fixture_ext_last_vm").unwrap().unwrap();
    unsafe {
        let calls: extern "C" fn() -> usize = std::mem::transmute(calls);
        let last_vm: extern "C" fn() -> *mut c_void = std::mem::transmute(last_vm);
        (calls(), last_vm())
    }
}

#[test]
fn test_real_library_runs_init_and_blob() {
    let dir = tempfile::tempdir().unwrap();
    let Some(path) = install_fixture(dir.path()) else {
        return;
    };
    let mut vm = Vm::new();

    load_library(&mut vm, &path, &PlatformLinker).unwrap();

    let (calls, last_vm) = fixture_state(&path);
    assert_eq!(calls, 1);
    assert_eq!(last_vm, &mut vm as *mut Vm as *mut c_void);
    assert_eq!(vm.global("fixture_loaded"), Some(Value::from("native")));
    assert_eq!(vm.eval("fixture_answer()").unwrap(), Value::Int(42));
}

#[test]
fn test_load_resolves_real_library() {
    let dir = tempfile::tempdir().unwrap();
    if install_fixture(dir.path()).is_none() {
        return;
    }
    let mut vm = create_vm(&options_in(dir.path()));

    assert_eq!(vm.eval("load(\"fixture-ext\")").unwrap(), Value::Bool(true));
    assert_eq!(vm.global("fixture_loaded"), Some(Value::from("native")));
}
