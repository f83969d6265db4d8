//! Compiler bridge
//!
//! Compiles source text into serialized bytecode inside a throwaway VM, so
//! nothing in the program runs and the caller's VM is never touched.

use crate::error::LoadError;
use rill_engine::{CompileContext, Loaded, Vm};
use std::io::Write;
use tracing::debug;

/// Label used when no path is given
pub const DEFAULT_LABEL: &str = "-";

/// Compile `source` and write the unit, with debug info, to `out`.
///
/// A compile failure is reported as [`LoadError::Compile`]; the diagnostic
/// itself is only logged.
pub fn compile_to_writer<W: Write>(
    source: &str,
    path: Option<&str>,
    out: &mut W,
) -> Result<(), LoadError> {
    let mut context = CompileContext::new().no_exec().with_debug_info();
    if let Some(path) = path {
        context = context.with_filename(path);
    }
    let label = context.label().to_string();

    let mut sandbox = Vm::new();
    let unit = match sandbox.load_source(source, &context) {
        Ok(Loaded::Compiled(unit)) => unit,
        Ok(Loaded::Executed(_)) => return Err(LoadError::Compile { path: label }),
        Err(err) => {
            debug!(file = %label, error = %err, "compilation failed");
            return Err(LoadError::Compile { path: label });
        }
    };
    drop(sandbox);

    unit.write_to(out).map_err(LoadError::Scratch)?;
    debug!(file = %label, bytes = unit.code.len(), "compiled to bytecode");
    Ok(())
}
