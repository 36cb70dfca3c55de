//! Wire protocol between a master hub and its radio-connected modules.
//!
//! The crate owns the whole byte-level contract: the record shapes and size
//! limits in [`wire`], the host-to-modem API framing in [`frame`], the
//! byte-at-a-time receive staging in [`transport`], and the module command
//! set in [`command`]. A [`Station`] ties them to a [`Link`], any byte pipe
//! to a modem, and speaks either the master or the module role.

#![cfg_attr(not(test), no_std)]

#[cfg(feature = "std")]
extern crate std;

#[macro_use]
extern crate bitfield;

pub mod at;
pub mod command;
pub mod frame;
pub mod transport;
pub mod wire;

mod parser;

#[cfg(feature = "serial_link")]
mod serial_link;

#[cfg(feature = "serial_link")]
pub use serial_link::SerialLink;

use core::fmt;

use frame::{ApiFrame, FrameError, TransmitRequest, TransmitStatus};
use transport::Accumulator;
use wire::{MasterRequest, ReceiveFrame, WireError};

/// A byte pipe to the local modem.
pub trait Link {
    type Error;

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;
    fn read(&mut self) -> nb::Result<u8, Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    Link(E),
    Frame(FrameError),
    Wire(WireError),
    /// Operation is only valid for the master role.
    NotMaster,
    /// Operation is only valid for the module role.
    NotModule,
    /// The ingest budget ran out before the expected frame arrived.
    Timeout,
}

impl<E> From<FrameError> for Error<E> {
    fn from(err: FrameError) -> Self {
        Error::Frame(err)
    }
}

impl<E> From<WireError> for Error<E> {
    fn from(err: WireError) -> Self {
        Error::Wire(err)
    }
}

impl<E: fmt::Display> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Link(ref err) => write!(f, "link error: {}", err),
            Error::Frame(ref err) => write!(f, "{}", err),
            Error::Wire(ref err) => write!(f, "{}", err),
            Error::NotMaster => write!(f, "not the master endpoint"),
            Error::NotModule => write!(f, "not a module endpoint"),
            Error::Timeout => write!(f, "timed out waiting for a frame"),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug + fmt::Display> std::error::Error for Error<E> {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Master,
    Module(u16),
}

/// One endpoint of the exchange, master or module, bound to a modem link.
pub struct Station<L: Link> {
    link: L,
    accumulator: Accumulator,
    role: Role,
    next_frame_id: u8,
}

impl<L: Link> Station<L> {
    pub fn new_master(link: L) -> Self {
        Station::new(link, Role::Master)
    }

    pub fn new_module(link: L, module_id: u16) -> Self {
        Station::new(link, Role::Module(module_id))
    }

    fn new(link: L, role: Role) -> Self {
        Station {
            link,
            accumulator: Accumulator::new(),
            role,
            next_frame_id: 1,
        }
    }

    pub fn module_id(&self) -> Option<u16> {
        match self.role {
            Role::Module(id) => Some(id),
            Role::Master => None,
        }
    }

    /// Frame ids wrap and skip zero, which the modem treats as "no status".
    fn take_frame_id(&mut self) -> u8 {
        let id = self.next_frame_id;
        self.next_frame_id = if id == u8::MAX { 1 } else { id + 1 };
        id
    }

    /// Pumps one byte from the link through the receive stage.
    ///
    /// `Ok(None)` when the link had nothing to read or a frame is still
    /// incomplete.
    pub fn ingest(&mut self) -> Result<Option<ApiFrame>, Error<L::Error>> {
        match self.link.read() {
            Ok(byte) => self.accumulator.ingest(byte).map_err(Error::Frame),
            Err(nb::Error::WouldBlock) => Ok(None),
            Err(nb::Error::Other(err)) => Err(Error::Link(err)),
        }
    }

    /// Queues `payload` for over-the-air transmission to `dest_addr` and
    /// returns the frame id of the request.
    pub fn transmit(&mut self, dest_addr: u64, payload: &[u8]) -> Result<u8, Error<L::Error>> {
        let frame_id = self.take_frame_id();
        let request = TransmitRequest::new(dest_addr, frame_id, payload)?;
        let encoded = request.encode()?;
        self.link.write(&encoded).map_err(Error::Link)?;
        Ok(frame_id)
    }

    /// Master only: sends one command toward a module.
    pub fn send_request(
        &mut self,
        dest_addr: u64,
        request: &MasterRequest,
    ) -> Result<u8, Error<L::Error>> {
        if self.role != Role::Master {
            return Err(Error::NotMaster);
        }
        let encoded = request.encode();
        self.transmit(dest_addr, &encoded)
    }

    /// Pumps the link until the status for `frame_id` arrives or `budget`
    /// ingest calls have been spent. Unrelated frames are dropped.
    pub fn await_status(
        &mut self,
        frame_id: u8,
        budget: usize,
    ) -> Result<TransmitStatus, Error<L::Error>> {
        for _ in 0..budget {
            if let Some(ApiFrame::TransmitStatus(status)) = self.ingest()? {
                if status.frame_id == frame_id {
                    return Ok(status);
                }
            }
        }
        Err(Error::Timeout)
    }

    /// Pumps the link until a receive frame arrives or `budget` ingest calls
    /// have been spent.
    pub fn await_receive(&mut self, budget: usize) -> Result<ReceiveFrame, Error<L::Error>> {
        for _ in 0..budget {
            if let Some(ApiFrame::Receive(frame)) = self.ingest()? {
                return Ok(frame);
            }
        }
        Err(Error::Timeout)
    }

    /// Module only: one non-blocking poll for a request this module must
    /// service. Frames addressed to other modules are dropped silently;
    /// malformed payloads surface as errors so the caller can log them.
    pub fn poll_request(
        &mut self,
    ) -> Result<Option<(ReceiveFrame, MasterRequest)>, Error<L::Error>> {
        let module_id = match self.role {
            Role::Module(id) => id,
            Role::Master => return Err(Error::NotModule),
        };
        let frame = match self.ingest()? {
            Some(ApiFrame::Receive(frame)) => frame,
            _ => return Ok(None),
        };
        let request = MasterRequest::decode(&frame.rf_data).map_err(Error::Wire)?;
        if !request.addressed_to(module_id) {
            return Ok(None);
        }
        Ok(Some((frame, request)))
    }

    /// Module only: answers a received frame's sender.
    pub fn respond(&mut self, to: &ReceiveFrame, payload: &[u8]) -> Result<u8, Error<L::Error>> {
        if self.module_id().is_none() {
            return Err(Error::NotModule);
        }
        self.transmit(to.source_addr, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct ScriptLink {
        inbound: VecDeque<u8>,
        outbound: std::vec::Vec<u8>,
    }

    impl ScriptLink {
        fn new(inbound: &[u8]) -> Self {
            ScriptLink {
                inbound: inbound.iter().copied().collect(),
                outbound: std::vec::Vec::new(),
            }
        }
    }

    impl Link for ScriptLink {
        type Error = core::convert::Infallible;

        fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
            self.outbound.extend_from_slice(data);
            Ok(())
        }

        fn read(&mut self) -> nb::Result<u8, Self::Error> {
            self.inbound.pop_front().ok_or(nb::Error::WouldBlock)
        }
    }

    #[test]
    fn frame_ids_wrap_and_skip_zero() {
        let mut station = Station::new_master(ScriptLink::new(&[]));
        station.next_frame_id = u8::MAX;
        assert_eq!(station.take_frame_id(), u8::MAX);
        assert_eq!(station.take_frame_id(), 1);
    }

    #[test]
    fn send_request_is_master_only() {
        let mut station = Station::new_module(ScriptLink::new(&[]), wire::MOD_ID);
        let probe = command::discovery_probe();
        assert!(matches!(
            station.send_request(wire::BROADCAST_ADDR, &probe),
            Err(Error::NotMaster)
        ));
    }

    #[test]
    fn poll_request_drops_requests_for_other_modules() {
        let request = command::discovery_probe();
        let mut for_other = wire::MasterRequest::new(wire::DEER_FEEDER_ID, request.cmd);
        for_other.args = request.args;
        let frame = ReceiveFrame::new(0xaa55, 0, &for_other.encode()).unwrap();
        let encoded = frame.encode().unwrap();

        let mut station = Station::new_module(ScriptLink::new(&encoded), wire::MOD_ID);
        for _ in 0..encoded.len() {
            assert_eq!(station.poll_request().unwrap(), None);
        }
    }

    #[test]
    fn await_status_times_out_on_a_quiet_link() {
        let mut station = Station::new_master(ScriptLink::new(&[]));
        assert!(matches!(
            station.await_status(1, 4),
            Err(Error::Timeout)
        ));
    }
}
