//! Rill command-line tool
//!
//! Runs source, bytecode and native extension files, compiles source to
//! bytecode, and evaluates inline snippets.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use rill_runtime::RuntimeOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter
const LOG_ENV: &str = "RILL_LOG";

#[derive(Parser)]
#[command(name = "rill")]
#[command(about = "Rill scripting language toolchain", long_about = None)]
#[command(version)]
struct Cli {
    /// Read runtime options from a TOML file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Prepend a directory to the load path (repeatable)
    #[arg(short = 'I', long = "include", global = true)]
    include: Vec<PathBuf>,

    /// Directory for scratch files
    #[arg(long, global = true)]
    scratch_dir: Option<PathBuf>,

    /// When to use colors: auto, always, never
    #[arg(long, global = true)]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a source (.rill), bytecode (.rbc) or native extension file
    Run {
        /// Input file
        file: PathBuf,
    },

    /// Compile a source file to bytecode (.rbc)
    Build {
        /// Source file
        file: PathBuf,
        /// Output file, defaults to the input with an .rbc extension
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Evaluate inline source
    Eval {
        /// Source text
        code: String,
        /// Print the resulting value
        #[arg(short, long)]
        print: bool,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Layer defaults, `RILLLIB`, the config file and command-line flags
fn runtime_options(cli: &Cli) -> anyhow::Result<RuntimeOptions> {
    let mut options = match &cli.config {
        Some(path) => RuntimeOptions::from_toml_file(path)?,
        None => RuntimeOptions::default(),
    };
    options = options.with_lib_path(std::env::var_os(rill_runtime::options::LIB_PATH_ENV).as_deref());
    options.prepend_load_path(cli.include.iter().cloned());
    if let Some(dir) = &cli.scratch_dir {
        options.scratch_dir = Some(dir.clone());
    }
    Ok(options)
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let options = runtime_options(cli)?;
    match &cli.command {
        Commands::Run { file } => commands::run::execute(file, &options),
        Commands::Build { file, output } => {
            let choice = output::resolve_color_choice(cli.color.as_deref());
            commands::build::execute(file, output.as_deref(), choice)
        }
        Commands::Eval { code, print } => commands::eval::execute(code, *print, &options),
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let choice = output::resolve_color_choice(cli.color.as_deref());
            output::StyledOutput::new(choice).error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}
