//! Native serial port implementation using the `serialport` crate.

use {
    crate::{
        error::Result,
        port::{Port, SerialConfig},
    },
    log::trace,
    serialport::ClearBuffer,
    std::io::{Read, Write},
};

/// Native serial port bound to a real device.
pub struct NativePort {
    port: Option<Box<dyn serialport::SerialPort>>,
    name: String,
}

impl NativePort {
    /// Open a serial port with the given configuration.
    ///
    /// The link is always 8 data bits, no parity, one stop bit, no flow
    /// control; the programmer firmware accepts nothing else.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(&config.port_name, config.baud_rate)
            .timeout(config.poll_timeout)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .open()?;

        Ok(Self {
            port: Some(port),
            name: config.port_name.clone(),
        })
    }

    /// Open a device path with default settings.
    pub fn open_path(port_name: &str) -> Result<Self> {
        Self::open(&SerialConfig::new(port_name))
    }

    fn closed_err() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::NotConnected, "port closed")
    }
}

impl Port for NativePort {
    fn send(&mut self, data: &[u8]) -> Result<usize> {
        let port = self.port.as_mut().ok_or_else(Self::closed_err)?;
        let n = port.write(data)?;
        port.flush()?;
        trace!("sent {n}/{} bytes", data.len());
        Ok(n)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        let port = self.port.as_mut().ok_or_else(Self::closed_err)?;
        match port.read(buf) {
            Ok(n) => Ok(n),
            // serialport signals "nothing arrived within the poll timeout"
            // as an error; the Port contract is a zero-length read.
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn discard_pending(&mut self) -> Result<()> {
        if let Some(ref mut p) = self.port {
            p.clear(ClearBuffer::All)?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn close(&mut self) -> Result<()> {
        // Take ownership of the port and let it drop (close)
        self.port.take();
        Ok(())
    }
}
