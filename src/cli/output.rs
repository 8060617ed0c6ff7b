//! Colored terminal output for release runs
//!
//! Status lines go to stdout, errors to stderr. Quiet mode silences
//! everything except errors.

use std::io::Write;
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Output manager for consistent colored terminal output
#[derive(Debug)]
pub struct OutputManager {
    bufwtr: BufferWriter,
    quiet: bool,
}

impl Clone for OutputManager {
    fn clone(&self) -> Self {
        Self::new(self.quiet)
    }
}

impl OutputManager {
    /// Create a new output manager
    pub fn new(quiet: bool) -> Self {
        Self {
            bufwtr: BufferWriter::stdout(ColorChoice::Auto),
            quiet,
        }
    }

    /// Write `symbol message` with the symbol in `color`
    fn marked(&self, symbol: &str, color: Color, message: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        let mut buffer = self.bufwtr.buffer();
        buffer.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
        write!(&mut buffer, "{symbol}")?;
        buffer.reset()?;
        writeln!(&mut buffer, " {message}")?;
        self.bufwtr.print(&buffer)
    }

    /// Print an info message
    pub fn info(&self, message: &str) -> std::io::Result<()> {
        self.marked("ℹ", Color::Cyan, message)
    }

    /// Print a success message
    pub fn success(&self, message: &str) -> std::io::Result<()> {
        self.marked("✓", Color::Green, message)
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) -> std::io::Result<()> {
        self.marked("⚠", Color::Yellow, message)
    }

    /// Print an error message to stderr (always shown)
    pub fn error(&self, message: &str) {
        let bufwtr = BufferWriter::stderr(ColorChoice::Auto);
        let mut buffer = bufwtr.buffer();

        let written = buffer
            .set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))
            .and_then(|_| write!(&mut buffer, "✗"))
            .and_then(|_| buffer.reset())
            .and_then(|_| writeln!(&mut buffer, " {message}"))
            .and_then(|_| bufwtr.print(&buffer));

        if written.is_err() {
            println!("[STDERR ERROR] ✗ {message}");
        }
    }

    /// Print a section header
    pub fn section(&self, title: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        let mut buffer = self.bufwtr.buffer();
        writeln!(&mut buffer)?;
        buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
        writeln!(&mut buffer, "═══ {title} ═══")?;
        buffer.reset()?;
        self.bufwtr.print(&buffer)
    }

    /// Print indented text (for sub-items)
    pub fn indent(&self, message: &str) -> std::io::Result<()> {
        self.println(&format!("    {message}"))
    }

    /// Print a plain message (respects quiet mode)
    pub fn println(&self, message: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        let mut buffer = self.bufwtr.buffer();
        writeln!(&mut buffer, "{message}")?;
        self.bufwtr.print(&buffer)
    }
}
