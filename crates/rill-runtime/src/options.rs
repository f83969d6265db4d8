//! Runtime configuration
//!
//! Options are layered: built-in defaults, then an optional TOML file, then
//! whatever the embedder or CLI sets. Entries of the `RILLLIB` environment
//! variable are always placed at the front of the load path.

use crate::scratch::TempScratch;
use rill_engine::VmOptions;
use serde::Deserialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable holding extra load path entries
pub const LIB_PATH_ENV: &str = "RILLLIB";

/// Errors reading a configuration file
#[derive(Debug, Error)]
pub enum OptionsError {
    /// Failed to read the file
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loader and VM configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeOptions {
    /// Directories searched by `load` and `require`
    pub load_path: Vec<PathBuf>,
    /// Where scratch files are created; the system temp dir when unset
    pub scratch_dir: Option<PathBuf>,
    /// Deepest unit nesting accepted when reading bytecode
    pub max_unit_depth: usize,
    /// Longest string constant accepted when reading bytecode
    pub max_string_len: usize,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        let vm = VmOptions::default();
        Self {
            load_path: vec![PathBuf::from(".")],
            scratch_dir: None,
            max_unit_depth: vm.max_unit_depth,
            max_string_len: vm.max_string_len,
        }
    }
}

impl RuntimeOptions {
    /// Defaults plus the `RILLLIB` environment variable
    pub fn from_env() -> Self {
        Self::default().with_lib_path(std::env::var_os(LIB_PATH_ENV).as_deref())
    }

    /// Parse options from a TOML file; missing keys keep their defaults
    pub fn from_toml_file(path: &Path) -> Result<Self, OptionsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse options from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, OptionsError> {
        Ok(toml::from_str(content)?)
    }

    /// Prepend the entries of a `RILLLIB`-style value (platform path
    /// separator) to the load path, dropping duplicates.
    pub fn with_lib_path(mut self, value: Option<&OsStr>) -> Self {
        if let Some(value) = value {
            let entries = std::env::split_paths(value).filter(|p| !p.as_os_str().is_empty());
            self.prepend_load_path(entries);
        }
        self
    }

    /// Put `entries` in front of the load path, keeping first occurrences
    pub fn prepend_load_path<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut merged: Vec<PathBuf> = entries.into_iter().collect();
        merged.append(&mut self.load_path);
        let mut unique = Vec::with_capacity(merged.len());
        for entry in merged {
            if !unique.contains(&entry) {
                unique.push(entry);
            }
        }
        self.load_path = unique;
    }

    /// Scratch file source honoring `scratch_dir`
    pub fn scratch(&self) -> TempScratch {
        match &self.scratch_dir {
            Some(dir) => TempScratch::in_dir(dir),
            None => TempScratch::new(),
        }
    }

    /// VM limits derived from these options
    pub fn vm_options(&self) -> VmOptions {
        VmOptions {
            max_unit_depth: self.max_unit_depth,
            max_string_len: self.max_string_len,
            ..VmOptions::default()
        }
    }
}
