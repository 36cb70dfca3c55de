//! The byte-level contract shared by every encoder and decoder on the
//! network: record shapes, size limits, and well-known identifiers.
//!
//! All multi-byte fields are network byte order with no padding; fields are
//! read and written in declared order. Scalar sensor values carried *inside*
//! `rf_data` are the exception and ride little-endian (see
//! [`crate::command`]).

use core::fmt;

use heapless::Vec;

/// Maximum payload of one radio frame.
pub const MAX_RF_DATA_LEN: usize = 8;

/// Maximum length of one staged receive packet (API frame body).
pub const MAX_RX_PACKET_LEN: usize = 64;

/// Factory id of the prototype module.
pub const MOD_ID: u16 = 0x001a;

/// Factory id of the deer feeder module.
pub const DEER_FEEDER_ID: u16 = 0x002b;

/// Wildcard module id. Every module answers requests addressed to it.
pub const ANY_MODULE: u16 = 0xffff;

/// Radio broadcast address.
pub const BROADCAST_ADDR: u64 = 0xffff;

/// Payload storage for one radio frame. Capacity is fixed at
/// [`MAX_RF_DATA_LEN`]; the in-band length lives in the framing layer.
pub type RfPayload = Vec<u8, MAX_RF_DATA_LEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    /// Input ended before the record did.
    Truncated,
    /// Payload or argument data exceeds its fixed capacity.
    Oversize,
    /// Command byte is not a known opcode.
    UnknownOpcode(u8),
    /// Response payload does not match the layout for its opcode.
    BadResponse,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            WireError::Truncated => write!(f, "record truncated"),
            WireError::Oversize => write!(f, "data exceeds fixed capacity"),
            WireError::UnknownOpcode(op) => write!(f, "unknown opcode {:#04x}", op),
            WireError::BadResponse => write!(f, "malformed response payload"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for WireError {}

bitfield! {
    /// Reception options attached to an inbound radio frame.
    ///
    /// Bits 2..7 are reserved and preserved verbatim.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct ReceiveOptions(u8);
    impl Debug;
    /// The frame was acknowledged by the receiver.
    pub acknowledged, set_acknowledged: 0;
    /// The frame was sent as a broadcast.
    pub broadcast, set_broadcast: 1;
}

impl ReceiveOptions {
    pub fn bits(&self) -> u8 {
        self.0
    }
}

impl From<u8> for ReceiveOptions {
    fn from(bits: u8) -> Self {
        ReceiveOptions(bits)
    }
}

/// One inbound radio frame as decoded by a receiver.
///
/// `rf_data` always reserves exactly [`MAX_RF_DATA_LEN`] bytes of storage
/// regardless of how much payload arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveFrame {
    pub source_addr: u64,
    pub recv_opts: ReceiveOptions,
    pub rf_data: RfPayload,
}

impl ReceiveFrame {
    pub fn new(source_addr: u64, recv_opts: u8, data: &[u8]) -> Result<Self, WireError> {
        let rf_data = RfPayload::from_slice(data).map_err(|_| WireError::Oversize)?;
        Ok(ReceiveFrame {
            source_addr,
            recv_opts: ReceiveOptions(recv_opts),
            rf_data,
        })
    }
}

/// One command from the master to a module.
///
/// Encodes to exactly [`MasterRequest::LEN`] bytes, one full radio payload:
/// `module_id` (2, BE), `cmd` (1), `args` (5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterRequest {
    pub module_id: u16,
    pub cmd: u8,
    pub args: [u8; 5],
}

impl MasterRequest {
    pub const LEN: usize = 8;

    pub fn new(module_id: u16, cmd: u8) -> Self {
        MasterRequest {
            module_id,
            cmd,
            args: [0; 5],
        }
    }

    /// Builds a request with `args` zero-padded out to its fixed width.
    pub fn with_args(module_id: u16, cmd: u8, args: &[u8]) -> Result<Self, WireError> {
        if args.len() > 5 {
            return Err(WireError::Oversize);
        }
        let mut request = MasterRequest::new(module_id, cmd);
        request.args[..args.len()].copy_from_slice(args);
        Ok(request)
    }

    pub fn encode(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[0..2].copy_from_slice(&self.module_id.to_be_bytes());
        buf[2] = self.cmd;
        buf[3..8].copy_from_slice(&self.args);
        buf
    }

    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        if data.len() < Self::LEN {
            return Err(WireError::Truncated);
        }
        let mut args = [0u8; 5];
        args.copy_from_slice(&data[3..8]);
        Ok(MasterRequest {
            module_id: u16::from_be_bytes([data[0], data[1]]),
            cmd: data[2],
            args,
        })
    }

    /// Whether a module with `module_id` must service this request.
    pub fn addressed_to(&self, module_id: u16) -> bool {
        self.module_id == module_id || self.module_id == ANY_MODULE
    }
}
