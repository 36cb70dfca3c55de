//! [`Link`] over a host serial port.

use std::boxed::Box;
use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::SerialPort;

use crate::Link;

/// Byte pipe to a modem on a local serial port.
///
/// Reads are bounded by the port timeout; an exhausted timeout surfaces as
/// [`nb::Error::WouldBlock`], so one blocked [`Link::read`] call costs one
/// timeout interval.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(250);

    pub fn open(path: &str, baud: u32) -> Result<Self, serialport::Error> {
        let port = serialport::new(path, baud)
            .timeout(Self::DEFAULT_TIMEOUT)
            .open()?;
        Ok(SerialLink { port })
    }

    pub fn port_mut(&mut self) -> &mut dyn SerialPort {
        self.port.as_mut()
    }
}

impl Link for SerialLink {
    type Error = io::Error;

    fn write(&mut self, data: &[u8]) -> Result<(), io::Error> {
        self.port.write_all(data)?;
        self.port.flush()
    }

    fn read(&mut self) -> nb::Result<u8, io::Error> {
        let mut byte = [0u8; 1];
        match self.port.read(&mut byte) {
            Ok(0) => Err(nb::Error::WouldBlock),
            Ok(_) => Ok(byte[0]),
            Err(err)
                if err.kind() == io::ErrorKind::TimedOut
                    || err.kind() == io::ErrorKind::WouldBlock =>
            {
                Err(nb::Error::WouldBlock)
            }
            Err(err) => Err(nb::Error::Other(err)),
        }
    }
}
