//! The command set understood by modules, and the typed readings that come
//! back.
//!
//! Requests put the opcode in [`MasterRequest::cmd`] with opcode-specific
//! arguments zero-padded into `args`. Every response fits a single radio
//! payload; multi-byte counters ride big-endian while sensor scalars ride
//! little-endian `f32` (the layout the hosts have always decoded).

use crate::wire::{MasterRequest, RfPayload, WireError, ANY_MODULE};

/// Command opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Identify yourself; the reply carries the module id.
    Ping = 0x1d,
    /// Flip the module's latch and report the new state.
    Toggle = 0x2b,
    /// Read the module's event counter.
    ReadInt = 0x3c,
    /// Read the module's generic analog value.
    ReadFloat = 0x4a,
    /// Read temperature and relative humidity.
    TempHumidity = 0x5e,
    /// Read the module's wall clock.
    Clock = 0x6f,
    /// Read the rangefinder.
    Distance = 0x7d,
    /// Run the motor; `args[0]` is the duration in seconds.
    Motor = 0x8c,
    /// Set the wall clock; `args[0..4]` is a big-endian unix timestamp.
    SetClock = 0x9a,
}

impl TryFrom<u8> for Opcode {
    type Error = WireError;

    fn try_from(byte: u8) -> Result<Self, WireError> {
        match byte {
            0x1d => Ok(Opcode::Ping),
            0x2b => Ok(Opcode::Toggle),
            0x3c => Ok(Opcode::ReadInt),
            0x4a => Ok(Opcode::ReadFloat),
            0x5e => Ok(Opcode::TempHumidity),
            0x6f => Ok(Opcode::Clock),
            0x7d => Ok(Opcode::Distance),
            0x8c => Ok(Opcode::Motor),
            0x9a => Ok(Opcode::SetClock),
            other => Err(WireError::UnknownOpcode(other)),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(opcode: Opcode) -> u8 {
        opcode as u8
    }
}

impl Opcode {
    pub fn request(self, module_id: u16) -> MasterRequest {
        MasterRequest::new(module_id, self.into())
    }

    pub fn request_with_args(self, module_id: u16, args: &[u8]) -> Result<MasterRequest, WireError> {
        MasterRequest::with_args(module_id, self.into(), args)
    }
}

/// The broadcast ping every module in range answers with its id.
pub fn discovery_probe() -> MasterRequest {
    Opcode::Ping.request(ANY_MODULE)
}

/// Calendar fields of a module's wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReading {
    pub sec: u8,
    pub min: u8,
    pub hour: u8,
    pub day: u8,
    pub month: u8,
    pub year: u16,
}

/// One decoded response payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Pong { module_id: u16 },
    Toggle(bool),
    Int(u32),
    Float(f32),
    TempHumidity { celsius: f32, percent: f32 },
    Clock(ClockReading),
    Distance { centimeters: f32 },
    MotorAck,
}

impl Reading {
    /// Decodes the response payload for the request `opcode` produced it.
    pub fn decode(opcode: Opcode, rf_data: &[u8]) -> Result<Self, WireError> {
        match opcode {
            Opcode::Ping => Ok(Reading::Pong {
                module_id: u16::from_be_bytes(take::<2>(rf_data)?),
            }),
            Opcode::Toggle => Ok(Reading::Toggle(take::<1>(rf_data)?[0] != 0)),
            Opcode::ReadInt => Ok(Reading::Int(u32::from_be_bytes(take::<4>(rf_data)?))),
            Opcode::ReadFloat => Ok(Reading::Float(f32::from_le_bytes(take::<4>(rf_data)?))),
            Opcode::TempHumidity => {
                if rf_data.len() < 8 {
                    return Err(WireError::Truncated);
                }
                Ok(Reading::TempHumidity {
                    celsius: f32::from_le_bytes(take::<4>(&rf_data[0..4])?),
                    percent: f32::from_le_bytes(take::<4>(&rf_data[4..8])?),
                })
            }
            Opcode::Clock | Opcode::SetClock => {
                if rf_data.len() < 7 {
                    return Err(WireError::Truncated);
                }
                Ok(Reading::Clock(ClockReading {
                    sec: rf_data[0],
                    min: rf_data[1],
                    hour: rf_data[2],
                    day: rf_data[3],
                    month: rf_data[4],
                    year: u16::from_be_bytes([rf_data[5], rf_data[6]]),
                }))
            }
            Opcode::Distance => Ok(Reading::Distance {
                centimeters: f32::from_le_bytes(take::<4>(rf_data)?),
            }),
            Opcode::Motor => match take::<1>(rf_data)?[0] {
                0x01 => Ok(Reading::MotorAck),
                _ => Err(WireError::BadResponse),
            },
        }
    }

    /// Encodes this reading as a response payload.
    pub fn encode(&self) -> Result<RfPayload, WireError> {
        let mut out = RfPayload::new();
        let put = |out: &mut RfPayload, data: &[u8]| {
            out.extend_from_slice(data).map_err(|_| WireError::Oversize)
        };
        match *self {
            Reading::Pong { module_id } => put(&mut out, &module_id.to_be_bytes())?,
            Reading::Toggle(state) => put(&mut out, &[state as u8])?,
            Reading::Int(value) => put(&mut out, &value.to_be_bytes())?,
            Reading::Float(value) => put(&mut out, &value.to_le_bytes())?,
            Reading::TempHumidity { celsius, percent } => {
                put(&mut out, &celsius.to_le_bytes())?;
                put(&mut out, &percent.to_le_bytes())?;
            }
            Reading::Clock(clock) => {
                put(
                    &mut out,
                    &[clock.sec, clock.min, clock.hour, clock.day, clock.month],
                )?;
                put(&mut out, &clock.year.to_be_bytes())?;
            }
            Reading::Distance { centimeters } => put(&mut out, &centimeters.to_le_bytes())?,
            Reading::MotorAck => put(&mut out, &[0x01])?,
        }
        Ok(out)
    }
}

fn take<const N: usize>(data: &[u8]) -> Result<[u8; N], WireError> {
    if data.len() < N {
        return Err(WireError::Truncated);
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&data[..N]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::MOD_ID;

    #[test]
    fn opcode_bytes_are_stable() {
        assert_eq!(u8::from(Opcode::Ping), 0x1d);
        assert_eq!(u8::from(Opcode::SetClock), 0x9a);
        assert_eq!(Opcode::try_from(0x5e), Ok(Opcode::TempHumidity));
        assert_eq!(Opcode::try_from(0x00), Err(WireError::UnknownOpcode(0x00)));
    }

    #[test]
    fn discovery_probe_pings_every_module() {
        let probe = discovery_probe();
        assert_eq!(probe.module_id, ANY_MODULE);
        assert_eq!(probe.cmd, u8::from(Opcode::Ping));
    }

    #[test]
    fn pong_carries_the_module_id_big_endian() {
        let reading = Reading::Pong { module_id: MOD_ID };
        let payload = reading.encode().unwrap();
        assert_eq!(&payload[..], &[0x00, 0x1a]);
        assert_eq!(Reading::decode(Opcode::Ping, &payload), Ok(reading));
    }

    #[test]
    fn temp_humidity_is_two_little_endian_floats() {
        let payload = Reading::TempHumidity {
            celsius: 21.5,
            percent: 40.0,
        }
        .encode()
        .unwrap();
        assert_eq!(payload.len(), 8);
        assert_eq!(&payload[0..4], &21.5f32.to_le_bytes());

        match Reading::decode(Opcode::TempHumidity, &payload) {
            Ok(Reading::TempHumidity { celsius, percent }) => {
                assert_eq!(celsius, 21.5);
                assert_eq!(percent, 40.0);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn clock_layout_fits_one_payload() {
        let clock = ClockReading {
            sec: 30,
            min: 15,
            hour: 12,
            day: 7,
            month: 6,
            year: 2021,
        };
        let payload = Reading::Clock(clock).encode().unwrap();
        assert_eq!(payload.len(), 7);
        assert_eq!(&payload[5..7], &2021u16.to_be_bytes());
        assert_eq!(
            Reading::decode(Opcode::Clock, &payload),
            Ok(Reading::Clock(clock))
        );
        // A set acknowledgment decodes with the same layout.
        assert_eq!(
            Reading::decode(Opcode::SetClock, &payload),
            Ok(Reading::Clock(clock))
        );
    }

    #[test]
    fn motor_ack_must_be_exactly_one() {
        assert_eq!(Reading::decode(Opcode::Motor, &[0x01]), Ok(Reading::MotorAck));
        assert_eq!(
            Reading::decode(Opcode::Motor, &[0x00]),
            Err(WireError::BadResponse)
        );
    }

    #[test]
    fn short_payloads_are_truncated() {
        assert_eq!(
            Reading::decode(Opcode::TempHumidity, &[0; 7]),
            Err(WireError::Truncated)
        );
        assert_eq!(
            Reading::decode(Opcode::Ping, &[0x00]),
            Err(WireError::Truncated)
        );
    }
}
