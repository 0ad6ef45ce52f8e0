//! promflash CLI - program parallel FLASH/EEPROM chips over a serial
//! programmer board.
//!
//! ## Features
//!
//! - Write a binary image to the chip and verify it byte for byte
//! - File checksum inspection (matches what the programmer firmware prints)
//! - Serial port listing and interactive selection
//! - Shell completion generation
//! - Environment variable support

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use env_logger::Env;
use log::debug;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

mod commands;
mod config;
mod serial;

use config::Config;

/// Whether stderr is a terminal (set once at startup).
static STDERR_IS_TTY: AtomicBool = AtomicBool::new(true);

/// Check if progress animations should be used (TTY and colors enabled).
pub(crate) fn use_fancy_output() -> bool {
    STDERR_IS_TTY.load(Ordering::Relaxed) && console::colors_enabled_stderr()
}

/// promflash - write a binary image to a parallel FLASH/EEPROM chip and
/// verify the result.
///
/// Environment variables:
///   PROMFLASH_PORT              - Default serial port
///   PROMFLASH_NON_INTERACTIVE   - Non-interactive mode (disable prompts)
#[derive(Parser)]
#[command(name = "promflash")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Serial port to use (auto-detected if not specified).
    #[arg(short, long, global = true, env = "PROMFLASH_PORT")]
    port: Option<String>,

    /// Verbose output level (-v, -vv for increasing detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-essential output).
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Non-interactive mode (fail instead of prompting).
    #[arg(long, global = true, env = "PROMFLASH_NON_INTERACTIVE")]
    non_interactive: bool,

    /// Path to a configuration file.
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Write an image to the chip and verify the written content.
    Flash {
        /// Path to the binary image file.
        image: PathBuf,

        /// Serial device to use (overrides --port; auto-detected if omitted).
        device: Option<String>,

        /// Verify inactivity threshold in milliseconds (silence that ends
        /// the read-back stream).
        #[arg(long, value_name = "MS")]
        verify_idle_ms: Option<u64>,

        /// Settle delay after opening the port, in milliseconds (boards
        /// that reset on open need a moment before the handshake).
        #[arg(long, value_name = "MS")]
        settle_ms: Option<u64>,
    },

    /// Print the byte size and 32-bit additive checksum of a file.
    Checksum {
        /// Path to the file.
        file: PathBuf,
    },

    /// List available serial ports.
    ListPorts {
        /// Output port list as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type for completions.
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_target(cli.verbose >= 2)
        .format_timestamp(None)
        .init();

    // NO_COLOR and TTY detection
    let stderr_is_tty = console::Term::stderr().is_term();
    STDERR_IS_TTY.store(stderr_is_tty, Ordering::Relaxed);
    if std::env::var("NO_COLOR").is_ok() || !stderr_is_tty {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    // Wire Ctrl-C into the library's interrupt checker so the open-ended
    // erase wait (and every other polling loop) stays cancellable.
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&interrupted);
        if let Err(e) = ctrlc::set_handler(move || {
            flag.store(true, Ordering::Relaxed);
        }) {
            debug!("could not install Ctrl-C handler: {e}");
        }
    }
    {
        let flag = Arc::clone(&interrupted);
        promflash::set_interrupt_checker(move || flag.load(Ordering::Relaxed));
    }

    debug!("promflash v{}", env!("CARGO_PKG_VERSION"));

    let config = if let Some(ref path) = cli.config_path {
        Config::load_from_path(path)
    } else {
        Config::load()
    };

    let outcome = match &cli.command {
        Commands::Flash {
            image,
            device,
            verify_idle_ms,
            settle_ms,
        } => commands::flash::cmd_flash(
            &cli,
            &config,
            image,
            device.as_deref(),
            *verify_idle_ms,
            *settle_ms,
        ),
        Commands::Checksum { file } => commands::checksum::cmd_checksum(file),
        Commands::ListPorts { json } => commands::list_ports::cmd_list_ports(*json),
        Commands::Completions { shell } => {
            commands::completions::cmd_completions(*shell);
            Ok(())
        },
    };

    std::process::exit(exit_code(outcome));
}

/// Map a command outcome to the process exit code: 0 success, 1 runtime or
/// verification failure, 2 usage/setup errors (clap produces its own 2s).
fn exit_code(outcome: Result<()>) -> i32 {
    match outcome {
        Ok(()) => 0,
        Err(err) => {
            eprintln!(
                "{} {err:#}",
                console::style("Error:").red().bold()
            );
            if err.downcast_ref::<commands::UsageError>().is_some() {
                2
            } else {
                1
            }
        },
    }
}
