//! Flash command implementation.

use anyhow::{Context, Result, anyhow};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use promflash::{
    Event, Image, NativePort, Phase, ProgrammerSession, SerialConfig, TransferConfig,
};
use std::path::Path;
use std::time::Duration;

use crate::config::Config;
use crate::serial::{SerialOptions, select_serial_port};
use crate::{Cli, use_fancy_output};

/// Flash command: load the image, open the port, run one transfer and
/// report the verification result.
pub(crate) fn cmd_flash(
    cli: &Cli,
    config: &Config,
    image_path: &Path,
    device: Option<&str>,
    verify_idle_ms: Option<u64>,
    settle_ms: Option<u64>,
) -> Result<()> {
    if !cli.quiet {
        eprintln!(
            "{} Loading image {}",
            style("•").cyan(),
            style(image_path.display()).bold()
        );
    }

    let image = Image::from_file(image_path)
        .with_context(|| format!("can't open image file '{}'", image_path.display()))?;

    if !cli.quiet {
        eprintln!("  {} bytes, checksum {}", image.len(), image.checksum());
    }

    // Positional device wins over the global --port flag.
    let options = SerialOptions {
        port: device.map(str::to_string).or_else(|| cli.port.clone()),
        non_interactive: cli.non_interactive,
    };
    let port_name = select_serial_port(&options, config)?;

    if !cli.quiet {
        eprintln!(
            "{} Using port {} at {} baud",
            style("•").cyan(),
            style(&port_name).bold(),
            promflash::BAUD_RATE
        );
    }

    let port = NativePort::open(&SerialConfig::new(&port_name))
        .with_context(|| format!("can't open serial device '{port_name}'"))?;

    let transfer_config = build_transfer_config(config, verify_idle_ms, settle_ms);
    let mut session = ProgrammerSession::with_config(port, transfer_config);

    // Progress bar driven by engine events
    let pb = if cli.quiet || !use_fancy_output() {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(100);
        #[allow(clippy::unwrap_used)] // Static template string
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb
    };

    let report = session.run(&image, |event| match event {
        Event::PhaseStarted(phase) => {
            pb.set_message(phase.to_string());
            if matches!(phase, Phase::Write | Phase::Verify) {
                pb.set_position(0);
            }
        },
        Event::WriteProgress(percent) | Event::VerifyProgress(percent) => {
            pb.set_position(u64::from(percent));
        },
    });

    let report = match report {
        Ok(report) => report,
        Err(err) => {
            pb.abandon();
            return Err(err.into());
        },
    };

    pb.finish_with_message("done");
    session.close()?;

    if !cli.quiet {
        eprintln!(
            "  Read back {} bytes, checksum {}",
            report.bytes_verified, report.read_checksum
        );
    }

    if report.is_success() {
        if !cli.quiet {
            eprintln!("{}", style("SUCCESS").green().bold());
        }
        Ok(())
    } else {
        Err(anyhow!(
            "verification found {} mismatched byte(s)",
            report.mismatches
        ))
    }
}

/// Engine timing from defaults, overridden by config file, then CLI flags.
fn build_transfer_config(
    config: &Config,
    verify_idle_ms: Option<u64>,
    settle_ms: Option<u64>,
) -> TransferConfig {
    let mut transfer = TransferConfig::default();

    if let Some(ms) = verify_idle_ms.or(config.transfer.verify_idle_ms) {
        transfer.verify_idle_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = settle_ms.or(config.transfer.settle_ms) {
        transfer.settle_delay = Duration::from_millis(ms);
    }
    transfer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransferSection;

    #[test]
    fn test_cli_flag_overrides_config_file() {
        let config = Config {
            transfer: TransferSection {
                verify_idle_ms: Some(900),
                settle_ms: Some(100),
            },
            ..Config::default()
        };

        let t = build_transfer_config(&config, Some(650), None);
        assert_eq!(t.verify_idle_timeout, Duration::from_millis(650));
        assert_eq!(t.settle_delay, Duration::from_millis(100));
    }

    #[test]
    fn test_defaults_apply_without_overrides() {
        let t = build_transfer_config(&Config::default(), None, None);
        assert_eq!(
            t.verify_idle_timeout,
            TransferConfig::default().verify_idle_timeout
        );
        assert_eq!(t.settle_delay, TransferConfig::default().settle_delay);
    }
}
