//! `rill build`: compile source to a bytecode file

use crate::output::StyledOutput;
use anyhow::Context;
use rill_runtime::compile::compile_to_writer;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use termcolor::ColorChoice;

pub fn execute(path: &Path, output: Option<&Path>, color: ColorChoice) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let out_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output(path));

    let label = path.display().to_string();
    let mut compiled = Vec::new();
    compile_to_writer(&source, Some(&label), &mut compiled).map_err(super::load_failure)?;

    let file = File::create(&out_path)
        .with_context(|| format!("Failed to create {}", out_path.display()))?;
    let mut writer = BufWriter::new(file);
    std::io::Write::write_all(&mut writer, &compiled)?;
    std::io::Write::flush(&mut writer)?;

    StyledOutput::new(color).success(
        "Compiled",
        &format!("{} -> {}", path.display(), out_path.display()),
    );
    Ok(())
}

fn default_output(path: &Path) -> PathBuf {
    path.with_extension("rbc")
}
