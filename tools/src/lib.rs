//! # maxcount-tools - Command Line Tools for maxcount
//!
//! This crate contains the binaries of the maxcount workspace and the
//! functionality they share.

use std::io::{self, IsTerminal, Write};

use termcolor::{BufferWriter, Color, ColorSpec, WriteColor};

/// The satisfiability oracle used by the tools
pub type Solver = maxcount_batsat::BasicSolver;

/// Colored status messages on the terminal
pub struct Printer {
    stderr: BufferWriter,
}

fn color_choice(choice: concolor_clap::ColorChoice, is_terminal: bool) -> termcolor::ColorChoice {
    match choice {
        concolor_clap::ColorChoice::Always => termcolor::ColorChoice::Always,
        concolor_clap::ColorChoice::Never => termcolor::ColorChoice::Never,
        concolor_clap::ColorChoice::Auto => {
            if is_terminal {
                termcolor::ColorChoice::Auto
            } else {
                termcolor::ColorChoice::Never
            }
        }
    }
}

impl Printer {
    /// Creates a printer following the color argument
    #[must_use]
    pub fn new(color: &concolor_clap::Color) -> Self {
        Printer {
            stderr: BufferWriter::stderr(color_choice(color.color, io::stderr().is_terminal())),
        }
    }

    /// The terminal color choice for log output
    #[must_use]
    pub fn log_color(color: &concolor_clap::Color) -> simplelog::ColorChoice {
        match color_choice(color.color, io::stderr().is_terminal()) {
            termcolor::ColorChoice::Always | termcolor::ColorChoice::AlwaysAnsi => {
                simplelog::ColorChoice::Always
            }
            termcolor::ColorChoice::Never => simplelog::ColorChoice::Never,
            termcolor::ColorChoice::Auto => simplelog::ColorChoice::Auto,
        }
    }

    fn tagged(writer: &BufferWriter, tag: &str, color: Color, msg: &str) -> io::Result<()> {
        let mut buffer = writer.buffer();
        buffer.set_color(ColorSpec::new().set_bold(true).set_fg(Some(color)))?;
        write!(&mut buffer, "{tag}")?;
        buffer.reset()?;
        buffer.set_color(ColorSpec::new().set_bold(true))?;
        write!(&mut buffer, ": ")?;
        buffer.reset()?;
        writeln!(&mut buffer, "{msg}")?;
        writer.print(&buffer)
    }

    /// Prints a warning
    ///
    /// # Errors
    ///
    /// If writing to the terminal fails
    pub fn warning(&self, msg: &str) -> io::Result<()> {
        Self::tagged(&self.stderr, "warning", Color::Yellow, msg)
    }

    /// Prints an error together with its chain of causes
    ///
    /// # Errors
    ///
    /// If writing to the terminal fails
    pub fn error(&self, err: &anyhow::Error) -> io::Result<()> {
        Self::tagged(&self.stderr, "error", Color::Red, &format!("{err:#}"))
    }
}

/// Installs the terminal logger. Progress is logged at verbosity 2, oracle
/// statistics additionally with `debug`.
///
/// # Errors
///
/// If a logger is already installed
pub fn init_logger(
    verbosity: u8,
    debug: bool,
    color: &concolor_clap::Color,
) -> anyhow::Result<()> {
    let level = if debug {
        simplelog::LevelFilter::Debug
    } else if verbosity >= 2 {
        simplelog::LevelFilter::Info
    } else {
        simplelog::LevelFilter::Warn
    };
    let config = simplelog::ConfigBuilder::new()
        .set_time_level(simplelog::LevelFilter::Off)
        .set_target_level(simplelog::LevelFilter::Off)
        .build();
    simplelog::TermLogger::init(
        level,
        config,
        simplelog::TerminalMode::Stderr,
        Printer::log_color(color),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::color_choice;

    #[test]
    fn color_only_on_terminals() {
        assert_eq!(
            color_choice(concolor_clap::ColorChoice::Auto, false),
            termcolor::ColorChoice::Never
        );
        assert_eq!(
            color_choice(concolor_clap::ColorChoice::Auto, true),
            termcolor::ColorChoice::Auto
        );
        assert_eq!(
            color_choice(concolor_clap::ColorChoice::Always, false),
            termcolor::ColorChoice::Always
        );
    }
}
