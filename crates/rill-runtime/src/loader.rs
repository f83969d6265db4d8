//! Bytecode loading and execution
//!
//! Every path ends in [`run_unit`]: the unit is wrapped into a callable,
//! bound to the top-level receiver and root class, and invoked with the
//! allocation arena bracketed around the call.

use crate::compile::{compile_to_writer, DEFAULT_LABEL};
use crate::error::LoadError;
use crate::scratch::{ScratchFile, ScratchProvider};
use rill_engine::compiler::{Opcode, Unit};
use rill_engine::vm::{ClassId, ReadError};
use rill_engine::{Value, Vm};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tracing::debug;

/// Deserialize one unit from `reader` and run it.
///
/// `path` only labels errors.
pub fn load_from_reader<R: Read + ?Sized>(
    vm: &mut Vm,
    reader: &mut R,
    path: &str,
) -> Result<Value, LoadError> {
    let mark = vm.arena_save();
    let read = vm.read_unit(reader);
    vm.arena_restore(mark);
    let unit = read_outcome(read, path)?;
    run_unit(vm, unit)
}

/// Deserialize one unit from an in-memory blob and run it.
///
/// # Safety
///
/// `data` must point to a serialized unit: a full header and as many bytes
/// as it declares, readable for the duration of the call.
pub unsafe fn load_from_ptr(vm: &mut Vm, data: *const u8, path: &str) -> Result<Value, LoadError> {
    let mark = vm.arena_save();
    let read = vm.read_unit_from_ptr(data);
    vm.arena_restore(mark);
    let unit = read_outcome(read, path)?;
    run_unit(vm, unit)
}

/// Open a bytecode file and run it
pub fn load_file(vm: &mut Vm, path: &Path) -> Result<Value, LoadError> {
    let label = path.display().to_string();
    let file = File::open(path).map_err(|source| LoadError::OpenFile {
        path: label.clone(),
        source,
    })?;
    load_from_reader(vm, &mut BufReader::new(file), &label)
}

/// Compile source text through a scratch file and run the result.
///
/// The scratch file is removed on every path out of this function.
pub fn load_source(
    vm: &mut Vm,
    source: &str,
    path: Option<&str>,
    scratch: &dyn ScratchProvider,
) -> Result<Value, LoadError> {
    let mut file = scratch.acquire().map_err(LoadError::Scratch)?;
    let result = compile_through(vm, source, path, &mut file);
    file.release();
    result
}

fn compile_through(
    vm: &mut Vm,
    source: &str,
    path: Option<&str>,
    file: &mut ScratchFile,
) -> Result<Value, LoadError> {
    compile_to_writer(source, path, file)?;
    file.rewind().map_err(LoadError::Scratch)?;
    load_from_reader(vm, file, path.unwrap_or(DEFAULT_LABEL))
}

/// Sort a read result into the two failure kinds: malformed data becomes a
/// fresh load error, an exception raised by the reader is kept as is.
fn read_outcome(read: Result<Unit, ReadError>, path: &str) -> Result<Unit, LoadError> {
    match read {
        Ok(unit) => Ok(unit),
        Err(ReadError::Malformed(source)) => {
            debug!(file = %path, error = %source, "malformed bytecode");
            Err(LoadError::Malformed {
                path: path.to_string(),
                source,
            })
        }
        Err(ReadError::Raised(err)) => Err(LoadError::Vm(err)),
    }
}

/// Rewrite a trailing `STOP` as `LOAD_NIL; RETURN` so the unit hands back
/// `nil` instead of halting the VM
pub fn replace_trailing_stop(unit: &mut Unit) -> bool {
    if !unit.ends_with_stop() {
        return false;
    }
    unit.code.pop();
    unit.code.push(Opcode::LoadNil.to_u8());
    unit.code.push(Opcode::Return.to_u8());
    true
}

/// Run a unit against the top-level receiver, defining methods on the root
/// class
pub fn run_unit(vm: &mut Vm, mut unit: Unit) -> Result<Value, LoadError> {
    if replace_trailing_stop(&mut unit) {
        debug!("rewrote trailing stop");
    }
    let mark = vm.arena_save();
    let proc = vm.new_proc(unit);
    let main = vm.main();
    let result = vm.yield_with_class(&proc, main, ClassId::OBJECT);
    vm.arena_restore(mark);
    Ok(result?)
}
