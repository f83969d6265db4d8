//! Colored terminal output
//!
//! Uses `termcolor` for cross-platform colors. Respects the `NO_COLOR`
//! environment variable and the `--color` flag.

use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Resolve `ColorChoice` from the CLI flag and environment.
///
/// Priority: `NO_COLOR` env > `--color` flag > auto-detect TTY.
pub fn resolve_color_choice(flag: Option<&str>) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        return ColorChoice::Never;
    }
    match flag {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}

/// Styled writer for status lines and diagnostics
pub struct StyledOutput {
    stdout: StandardStream,
    stderr: StandardStream,
}

impl StyledOutput {
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stdout: StandardStream::stdout(choice),
            stderr: StandardStream::stderr(choice),
        }
    }

    /// Green label followed by plain text on stdout
    pub fn success(&mut self, label: &str, text: &str) {
        write_labeled(&mut self.stdout, label, Color::Green, text);
    }

    /// Red `error:` label followed by the message on stderr
    pub fn error(&mut self, text: &str) {
        write_labeled(&mut self.stderr, "error:", Color::Red, text);
    }

    /// Plain line on stdout
    pub fn line(&mut self, text: &str) {
        let _ = writeln!(self.stdout, "{}", text);
    }
}

fn write_labeled(stream: &mut StandardStream, label: &str, color: Color, text: &str) {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(color)).set_bold(true);
    let _ = stream.set_color(&spec);
    let _ = write!(stream, "{}", label);
    let _ = stream.reset();
    let _ = writeln!(stream, " {}", text);
}
