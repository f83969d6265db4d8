//! Build script for the extension fixture
//!
//! Compiles fixture/fixture.rill and writes the serialized unit to OUT_DIR,
//! where the library embeds it as its bytecode entry point.

use std::env;
use std::fs;
use std::path::Path;

use rill_engine::{CompileContext, Vm};

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let source_path = Path::new(&manifest_dir).join("fixture").join("fixture.rill");
    println!("cargo:rerun-if-changed={}", source_path.display());

    let source = fs::read_to_string(&source_path)
        .unwrap_or_else(|e| panic!("failed to read {}: {}", source_path.display(), e));
    let unit = Vm::new()
        .compile_source(&source, &CompileContext::new())
        .unwrap_or_else(|e| panic!("failed to compile {}: {}", source_path.display(), e));
    let bytes = unit.encode();

    fs::write(Path::new(&out_dir).join("fixture.rbc"), &bytes).unwrap();
    fs::write(
        Path::new(&out_dir).join("fixture_len.rs"),
        format!("const BLOB_LEN: usize = {};\n", bytes.len()),
    )
    .unwrap();
}
