//! Serial port selection for CLI commands.
//!
//! Resolution order: explicit CLI port, configured default, then detection.
//! With a single candidate the choice is automatic; with several the user is
//! prompted unless running non-interactively.

use anyhow::Result;
use dialoguer::{Select, theme::ColorfulTheme};
use log::{debug, info};

use promflash::{detect_ports, format_port_list};

use crate::commands::UsageError;
use crate::config::Config;

/// Inputs that influence port selection.
pub(crate) struct SerialOptions {
    /// Explicitly requested port, if any.
    pub port: Option<String>,
    /// Fail instead of prompting when several ports qualify.
    pub non_interactive: bool,
}

/// Resolve the serial port to use.
pub(crate) fn select_serial_port(options: &SerialOptions, config: &Config) -> Result<String> {
    if let Some(ref port) = options.port {
        debug!("Using explicitly requested port: {port}");
        return Ok(port.clone());
    }

    if let Some(ref port) = config.connection.port {
        debug!("Using configured default port: {port}");
        return Ok(port.clone());
    }

    let ports = detect_ports();

    if ports.is_empty() {
        return Err(UsageError(
            "no serial ports found; connect the programmer board or pass --port".to_string(),
        )
        .into());
    }

    if ports.len() == 1 {
        info!("Auto-selected only available port: {}", ports[0].name);
        return Ok(ports[0].name.clone());
    }

    // Prefer a single recognised programmer bridge among many ports.
    let candidates: Vec<_> = ports.iter().filter(|p| p.is_likely_programmer()).collect();
    if candidates.len() == 1 {
        info!(
            "Auto-selected {} bridge: {}",
            candidates[0].device.name(),
            candidates[0].name
        );
        return Ok(candidates[0].name.clone());
    }

    if options.non_interactive {
        return Err(UsageError(format!(
            "{} serial ports found; pass --port to choose one (non-interactive mode)",
            ports.len()
        ))
        .into());
    }

    if !console::Term::stderr().is_term() {
        return Err(UsageError(
            "multiple serial ports found and stderr is not a terminal; pass --port".to_string(),
        )
        .into());
    }

    let items = format_port_list(&ports);
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select serial port")
        .items(&items)
        .default(0)
        .interact()?;

    Ok(ports[selection].name.clone())
}
