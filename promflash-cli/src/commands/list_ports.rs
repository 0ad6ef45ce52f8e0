//! Serial port listing.

use anyhow::Result;
use console::style;
use serde::Serialize;

use promflash::{DetectedPort, format_port_list};

/// JSON shape for one detected port (stable for scripted callers).
#[derive(Serialize)]
struct PortRecord<'a> {
    name: &'a str,
    device: &'a str,
    known: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    vid: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pid: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    manufacturer: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    product: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    serial: Option<&'a str>,
}

impl<'a> From<&'a DetectedPort> for PortRecord<'a> {
    fn from(port: &'a DetectedPort) -> Self {
        Self {
            name: &port.name,
            device: port.device.name(),
            known: port.device.is_known(),
            vid: port.vid,
            pid: port.pid,
            manufacturer: port.manufacturer.as_deref(),
            product: port.product.as_deref(),
            serial: port.serial.as_deref(),
        }
    }
}

/// List the serial ports the system reports, marking the ones whose USB
/// bridge looks like a programmer board.
pub(crate) fn cmd_list_ports(json: bool) -> Result<()> {
    let ports = promflash::detect_ports();

    if json {
        let records: Vec<PortRecord<'_>> = ports.iter().map(PortRecord::from).collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if ports.is_empty() {
        eprintln!("{}", style("No serial ports found.").yellow());
        return Ok(());
    }

    println!("Available serial ports:");
    for (port, line) in ports.iter().zip(format_port_list(&ports)) {
        let marker = if port.is_likely_programmer() {
            style("*").green().bold().to_string()
        } else {
            " ".to_string()
        };
        println!("  {marker} {line}");
    }
    println!();
    println!("Ports marked {} are auto-detect candidates.", style("*").green());

    Ok(())
}
