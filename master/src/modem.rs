//! Modem bring-up over the raw serial link.
//!
//! Before any API frame can flow, the attached modem has to be switched into
//! API framing mode: enter command mode with the guarded `+++` escape, set
//! `AP 1`, then drop back out. Responses in command mode are carriage-return
//! terminated ASCII lines.

use std::io;
use std::thread;
use std::time::Duration;

use heliograph::at::{AtCommand, AtCommands};
use heliograph::{Link, SerialLink};
use log::debug;

/// Silence required on both sides of the `+++` escape.
const GUARD_TIME: Duration = Duration::from_millis(1000);

/// Link read attempts per expected response line before giving up.
const LINE_BUDGET: usize = 64;

pub struct Modem {
    link: SerialLink,
    command_mode: bool,
}

impl Modem {
    pub fn new(link: SerialLink) -> Self {
        Modem {
            link,
            command_mode: false,
        }
    }

    /// Consumes the modem, handing the configured link to a station.
    pub fn into_link(self) -> SerialLink {
        self.link
    }

    /// Puts the modem into API framing mode and leaves command mode again.
    pub fn enable_api_mode(&mut self) -> io::Result<()> {
        self.command_mode(true)?;
        self.at(&AtCommands::Raw("AP", Some(b"1")).create())?;
        self.command_mode(false)?;
        Ok(())
    }

    fn command_mode(&mut self, enter: bool) -> io::Result<()> {
        if enter {
            thread::sleep(GUARD_TIME);
            self.at(&AtCommands::CmdMode(true).create())?;
            thread::sleep(GUARD_TIME);
            self.command_mode = true;
        } else {
            self.at(&AtCommands::CmdMode(false).create())?;
            self.command_mode = false;
        }
        Ok(())
    }

    /// Writes one AT command and drains its response lines.
    fn at(&mut self, command: &AtCommand) -> io::Result<String> {
        let mut tx = Vec::new();
        if command.command == "+++" {
            tx.extend_from_slice(command.command.as_bytes());
        } else {
            tx.extend_from_slice(b"AT");
            tx.extend_from_slice(command.command.as_bytes());
            if let Some(param) = command.parameter {
                tx.extend_from_slice(param);
            }
            tx.push(b'\r');
        }
        self.link.write(&tx)?;

        let response = self.read_response(command.response_lines)?;
        debug!("AT{} -> {:?}", command.command, response);
        Ok(response)
    }

    fn read_response(&mut self, lines: usize) -> io::Result<String> {
        let mut response = String::new();
        let mut seen = 0;
        let mut budget = lines * LINE_BUDGET;
        while seen < lines {
            if budget == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "modem did not answer in command mode",
                ));
            }
            budget -= 1;
            match self.link.read() {
                Ok(b'\r') => {
                    seen += 1;
                    response.push('\n');
                }
                Ok(byte) => response.push(byte as char),
                Err(nb::Error::WouldBlock) => continue,
                Err(nb::Error::Other(err)) => return Err(err),
            }
        }
        Ok(response)
    }
}
