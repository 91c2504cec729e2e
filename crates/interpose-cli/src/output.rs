//! Colored terminal output for the demo commands.
//!
//! Uses `termcolor` for cross-platform colored terminal output.
//! Respects the `NO_COLOR` environment variable and the `--color` flag.

use std::io::Write;

use interpose_engine::{ContractDescriptor, MethodSignature};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Resolve `ColorChoice` from CLI flag and environment.
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

/// Render one method as `#slot  name(params) -> ret`
pub fn signature_line(method: &MethodSignature) -> String {
    format!("#{:<3} {}", method.id().slot(), method)
}

/// Render a descriptor as the lines `describe` prints
pub fn descriptor_lines(descriptor: &ContractDescriptor) -> Vec<String> {
    let mut lines = Vec::with_capacity(descriptor.len() + 1);
    lines.push(format!(
        "{} [{}] {} method(s)",
        descriptor.name(),
        descriptor.id(),
        descriptor.len()
    ));
    lines.extend(descriptor.methods().iter().map(signature_line));
    lines
}

/// Styled output writer for terminal.
pub struct StyledOutput {
    stdout: StandardStream,
    stderr: StandardStream,
}

impl StyledOutput {
    /// Create a new styled output with the given color choice.
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stdout: StandardStream::stdout(choice),
            stderr: StandardStream::stderr(choice),
        }
    }

    fn writeln_styled(&mut self, text: &str, color: Option<Color>, bold: bool) {
        let mut spec = ColorSpec::new();
        spec.set_fg(color).set_bold(bold);
        let _ = self.stdout.set_color(&spec);
        let _ = writeln!(self.stdout, "{}", text);
        let _ = self.stdout.reset();
    }

    /// Green bold line.
    pub fn success(&mut self, text: &str) {
        self.writeln_styled(text, Some(Color::Green), true);
    }

    /// Yellow bold line.
    pub fn warning(&mut self, text: &str) {
        self.writeln_styled(text, Some(Color::Yellow), true);
    }

    /// Cyan line.
    pub fn info(&mut self, text: &str) {
        self.writeln_styled(text, Some(Color::Cyan), false);
    }

    /// Bold white line.
    pub fn heading(&mut self, text: &str) {
        self.writeln_styled(text, None, true);
    }

    /// Plain line (no color).
    pub fn plain(&mut self, text: &str) {
        let _ = writeln!(self.stdout, "{}", text);
    }

    /// Descriptor heading followed by its method lines.
    pub fn descriptor(&mut self, descriptor: &ContractDescriptor) {
        let mut lines = descriptor_lines(descriptor).into_iter();
        if let Some(heading) = lines.next() {
            self.heading(&heading);
        }
        for line in lines {
            self.plain(&format!("  {}", line));
        }
    }

    /// Write error message to stderr.
    pub fn stderr_error(&mut self, text: &str) {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Red)).set_bold(true);
        let _ = self.stderr.set_color(&spec);
        let _ = writeln!(self.stderr, "{}", text);
        let _ = self.stderr.reset();
    }
}
