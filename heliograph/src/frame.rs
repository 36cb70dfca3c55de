//! API frames exchanged between a host and its attached radio modem.
//!
//! Every frame shares one envelope:
//!
//! ```text
//! +------+----------------+-----------------+----------+
//! | 0x7e | length u16 BE  | body (length B) | checksum |
//! +------+----------------+-----------------+----------+
//! ```
//!
//! `length` counts the body only and may not exceed
//! [`MAX_RX_PACKET_LEN`]. The checksum is the additive complement of the
//! body: a frame verifies iff the body plus checksum sums to `0xff`.

use core::fmt;

use heapless::Vec;

use crate::parser;
use crate::wire::{ReceiveFrame, RfPayload, MAX_RF_DATA_LEN, MAX_RX_PACKET_LEN};

/// Start delimiter of every API frame.
pub const DELIM: u8 = 0x7e;

pub(crate) const API_TRANSMIT_REQUEST: u8 = 0x10;
pub(crate) const API_TRANSMIT_STATUS: u8 = 0x8b;
pub(crate) const API_RECEIVE: u8 = 0x90;

/// A fully encoded frame: envelope prefix, body, checksum.
pub type FrameBuffer = Vec<u8, { MAX_RX_PACKET_LEN + 4 }>;

type Body = Vec<u8, MAX_RX_PACKET_LEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Declared body length exceeds the staging bound.
    Oversize(u16),
    /// Body did not verify against its checksum byte.
    Checksum { expected: u8, actual: u8 },
    /// Body carries an API type this implementation does not know.
    UnknownApiType(u8),
    /// Body is too short or otherwise unparseable for its API type.
    Malformed,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            FrameError::Oversize(len) => write!(f, "frame body of {} bytes exceeds limit", len),
            FrameError::Checksum { expected, actual } => write!(
                f,
                "checksum mismatch: computed {:#04x}, frame carried {:#04x}",
                expected, actual
            ),
            FrameError::UnknownApiType(ty) => write!(f, "unknown api frame type {:#04x}", ty),
            FrameError::Malformed => write!(f, "malformed frame body"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FrameError {}

/// Additive complement checksum over a frame body.
pub fn checksum(body: &[u8]) -> u8 {
    let sum = body.iter().fold(0u8, |acc, byte| acc.wrapping_add(*byte));
    0xffu8.wrapping_sub(sum)
}

bitfield! {
    /// Transmit options byte of a [`TransmitRequest`].
    ///
    /// Bits 6..7 select the messaging mode: 1 point-to-point, 2 repeater,
    /// 3 mesh.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct TransmitOptions(u8);
    impl Debug;
    pub disable_ack, set_disable_ack: 0;
    pub disable_route_discovery, set_disable_route_discovery: 1;
    pub unicast_nack, set_unicast_nack: 2;
    pub unicast_trace_route, set_unicast_trace_route: 3;
    pub mode, set_mode: 7, 6;
}

impl TransmitOptions {
    pub fn bits(&self) -> u8 {
        self.0
    }
}

impl From<u8> for TransmitOptions {
    fn from(bits: u8) -> Self {
        TransmitOptions(bits)
    }
}

/// Host to modem: transmit `payload` to `dest_addr` over the air.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmitRequest {
    /// Correlation id echoed by the matching [`TransmitStatus`]. Zero asks
    /// the modem not to report status.
    pub frame_id: u8,
    pub dest_addr: u64,
    pub broadcast_radius: u8,
    pub options: TransmitOptions,
    pub payload: RfPayload,
}

impl TransmitRequest {
    pub fn new(dest_addr: u64, frame_id: u8, payload: &[u8]) -> Result<Self, FrameError> {
        let payload = RfPayload::from_slice(payload)
            .map_err(|_| FrameError::Oversize(payload.len() as u16))?;
        Ok(TransmitRequest {
            frame_id,
            dest_addr,
            broadcast_radius: 0,
            options: TransmitOptions::default(),
            payload,
        })
    }

    pub fn encode(&self) -> Result<FrameBuffer, FrameError> {
        let mut body = Body::new();
        put(&mut body, &[API_TRANSMIT_REQUEST, self.frame_id])?;
        put(&mut body, &self.dest_addr.to_be_bytes())?;
        put(&mut body, &0xfffeu16.to_be_bytes())?;
        put(&mut body, &[self.broadcast_radius, self.options.bits()])?;
        put(&mut body, &self.payload)?;
        seal(&body)
    }
}

/// Modem to host: fate of an earlier [`TransmitRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmitStatus {
    pub frame_id: u8,
    pub retry_count: u8,
    pub delivery_status: u8,
    pub discovery_status: u8,
}

impl TransmitStatus {
    pub fn delivered(&self) -> bool {
        self.delivery_status == 0
    }

    pub fn encode(&self) -> Result<FrameBuffer, FrameError> {
        let mut body = Body::new();
        put(
            &mut body,
            &[API_TRANSMIT_STATUS, self.frame_id, 0xff, 0xfe],
        )?;
        put(
            &mut body,
            &[self.retry_count, self.delivery_status, self.discovery_status],
        )?;
        seal(&body)
    }
}

impl ReceiveFrame {
    /// Encodes the modem-side `0x90` frame that announces this reception to
    /// a host.
    pub fn encode(&self) -> Result<FrameBuffer, FrameError> {
        if self.rf_data.len() > MAX_RF_DATA_LEN {
            return Err(FrameError::Oversize(self.rf_data.len() as u16));
        }
        let mut body = Body::new();
        put(&mut body, &[API_RECEIVE])?;
        put(&mut body, &self.source_addr.to_be_bytes())?;
        put(&mut body, &0xfffeu16.to_be_bytes())?;
        put(&mut body, &[self.recv_opts.bits()])?;
        put(&mut body, &self.rf_data)?;
        seal(&body)
    }
}

/// One decoded API frame body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiFrame {
    TransmitRequest(TransmitRequest),
    TransmitStatus(TransmitStatus),
    Receive(ReceiveFrame),
}

impl ApiFrame {
    /// Decodes a checksum-verified frame body.
    pub fn decode_body(body: &[u8]) -> Result<ApiFrame, FrameError> {
        parser::api_frame(body)
    }
}

fn put(body: &mut Body, data: &[u8]) -> Result<(), FrameError> {
    body.extend_from_slice(data)
        .map_err(|_| FrameError::Oversize((body.len() + data.len()) as u16))
}

/// Wraps a body in the delimiter-length envelope and appends the checksum.
fn seal(body: &[u8]) -> Result<FrameBuffer, FrameError> {
    if body.is_empty() {
        return Err(FrameError::Malformed);
    }
    if body.len() > MAX_RX_PACKET_LEN {
        return Err(FrameError::Oversize(body.len() as u16));
    }
    let mut out = FrameBuffer::new();
    let overflow = |_| FrameError::Oversize(body.len() as u16);
    out.push(DELIM).map_err(|_| FrameError::Malformed)?;
    out.extend_from_slice(&(body.len() as u16).to_be_bytes())
        .map_err(overflow)?;
    out.extend_from_slice(body).map_err(overflow)?;
    out.push(checksum(body)).map_err(|_| FrameError::Malformed)?;
    Ok(out)
}
