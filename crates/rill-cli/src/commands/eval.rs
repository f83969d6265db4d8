//! `rill eval`: evaluate an inline snippet

use super::load_failure;
use rill_runtime::loader::load_source;
use rill_runtime::{create_vm, RuntimeOptions};

/// Path label of inline source
const EVAL_LABEL: &str = "-e";

pub fn execute(code: &str, print: bool, options: &RuntimeOptions) -> anyhow::Result<()> {
    let mut vm = create_vm(options);
    let value = load_source(&mut vm, code, Some(EVAL_LABEL), &options.scratch()).map_err(load_failure)?;
    if print {
        println!("{}", value.inspect());
    }
    Ok(())
}
