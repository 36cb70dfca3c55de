//! Receive staging: turns a raw byte stream into verified API frames.
//!
//! One [`Accumulator`] owns all in-flight receive state. It stages the
//! 3-byte envelope prefix, then the body and checksum, consuming exactly one
//! byte per [`Accumulator::ingest`] call. Callers that share an accumulator
//! across contexts must wrap it themselves; the type itself is single-owner.

use heapless::Vec;

use crate::frame::{self, ApiFrame, FrameError, DELIM};
use crate::parser;
use crate::wire::MAX_RX_PACKET_LEN;

/// Byte-at-a-time frame assembler.
pub struct Accumulator {
    /// Envelope prefix staging: delimiter plus big-endian body length.
    header: [u8; 3],
    /// Header bytes staged so far.
    have: usize,
    /// Body staging.
    packet: Vec<u8, MAX_RX_PACKET_LEN>,
    /// Body bytes expected once the header is complete; zero while hunting.
    expect: usize,
}

impl Accumulator {
    pub const fn new() -> Self {
        Accumulator {
            header: [0; 3],
            have: 0,
            packet: Vec::new(),
            expect: 0,
        }
    }

    /// Drops any partially staged frame and resumes hunting for a delimiter.
    pub fn reset(&mut self) {
        self.have = 0;
        self.expect = 0;
        self.packet.clear();
    }

    /// Consumes one byte of the inbound stream.
    ///
    /// Returns `Ok(None)` while a frame is incomplete and
    /// `Ok(Some(frame))` once a complete body has verified against its
    /// checksum and parsed. Errors reset the accumulator; the stream stays
    /// usable and the next delimiter starts a fresh frame. Bytes that arrive
    /// outside a frame are discarded silently.
    pub fn ingest(&mut self, byte: u8) -> Result<Option<ApiFrame>, FrameError> {
        if self.expect == 0 {
            return self.ingest_header(byte);
        }

        if self.packet.len() < self.expect {
            if self.packet.push(byte).is_err() {
                let expect = self.expect;
                self.reset();
                return Err(FrameError::Oversize(expect as u16));
            }
            return Ok(None);
        }

        // Body complete; this byte is the checksum.
        let expected = frame::checksum(&self.packet);
        if byte != expected {
            self.reset();
            return Err(FrameError::Checksum {
                expected,
                actual: byte,
            });
        }
        let outcome = parser::api_frame(&self.packet);
        self.reset();
        outcome.map(Some)
    }

    fn ingest_header(&mut self, byte: u8) -> Result<Option<ApiFrame>, FrameError> {
        if self.have == 0 && byte != DELIM {
            // Hunting; inter-frame noise is not an error.
            return Ok(None);
        }
        self.header[self.have] = byte;
        self.have += 1;
        if self.have < self.header.len() {
            return Ok(None);
        }

        let length = u16::from_be_bytes([self.header[1], self.header[2]]) as usize;
        if length == 0 {
            self.reset();
            return Err(FrameError::Malformed);
        }
        if length > MAX_RX_PACKET_LEN {
            self.reset();
            return Err(FrameError::Oversize(length as u16));
        }
        self.expect = length;
        self.packet.clear();
        Ok(None)
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Accumulator::new()
    }
}
