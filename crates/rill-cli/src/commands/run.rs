//! `rill run`: execute a file, dispatching on its extension

use super::load_failure;
use anyhow::Context;
use rill_runtime::extension::{load_library, PlatformLinker};
use rill_runtime::loader::{load_file, load_source};
use rill_runtime::{create_vm, RuntimeOptions};
use std::path::Path;
use tracing::debug;

pub fn execute(path: &Path, options: &RuntimeOptions) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let mut vm = create_vm(options);
    let extension = rill_runtime::resolve::extension_of(path);
    debug!(file = %path.display(), kind = %extension, "running file");

    match extension.as_str() {
        ".rbc" => {
            load_file(&mut vm, path).map_err(load_failure)?;
        }
        ".so" | ".dylib" | ".dll" => {
            load_library(&mut vm, path, &PlatformLinker).map_err(load_failure)?;
        }
        _ => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let label = path.display().to_string();
            load_source(&mut vm, &source, Some(&label), &options.scratch()).map_err(load_failure)?;
        }
    }
    Ok(())
}
