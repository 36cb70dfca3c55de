//! Synthetic sensor bank standing in for real module hardware.
//!
//! Readings jitter around fixed baselines so a hub sees plausible values.
//! The wall clock is the host clock shifted by whatever offset the last
//! `SetClock` request established.

use chrono::{DateTime, Datelike, Timelike, Utc};
use heliograph::command::{ClockReading, Opcode, Reading};
use rand::Rng;

const BASE_CELSIUS: f32 = 21.0;
const BASE_HUMIDITY: f32 = 40.0;
const BASE_DISTANCE_CM: f32 = 120.0;

pub struct SensorBank {
    module_id: u16,
    latch: bool,
    counter: u32,
    analog: f32,
    /// Seconds the module clock leads the host clock.
    clock_offset: i64,
}

impl SensorBank {
    pub fn new(module_id: u16) -> Self {
        SensorBank {
            module_id,
            latch: false,
            counter: 0,
            analog: 1.618,
            clock_offset: 0,
        }
    }

    /// Executes one request and produces the reading to send back.
    pub fn service(&mut self, opcode: Opcode, args: &[u8; 5]) -> Reading {
        let mut rng = rand::thread_rng();
        match opcode {
            Opcode::Ping => Reading::Pong {
                module_id: self.module_id,
            },
            Opcode::Toggle => {
                self.latch = !self.latch;
                Reading::Toggle(self.latch)
            }
            Opcode::ReadInt => {
                self.counter = self.counter.wrapping_add(1);
                Reading::Int(self.counter)
            }
            Opcode::ReadFloat => Reading::Float(self.analog + rng.gen_range(-0.05..0.05)),
            Opcode::TempHumidity => Reading::TempHumidity {
                celsius: BASE_CELSIUS + rng.gen_range(-1.5..1.5),
                percent: BASE_HUMIDITY + rng.gen_range(-5.0..5.0),
            },
            Opcode::Clock => Reading::Clock(self.clock()),
            Opcode::Distance => Reading::Distance {
                centimeters: BASE_DISTANCE_CM + rng.gen_range(-10.0..10.0),
            },
            Opcode::Motor => Reading::MotorAck,
            Opcode::SetClock => {
                let epoch = u32::from_be_bytes([args[0], args[1], args[2], args[3]]);
                self.clock_offset = epoch as i64 - Utc::now().timestamp();
                Reading::Clock(self.clock())
            }
        }
    }

    fn clock(&self) -> ClockReading {
        let now = Utc::now().timestamp() + self.clock_offset;
        let stamp = DateTime::<Utc>::from_timestamp(now, 0).unwrap_or_default();
        ClockReading {
            sec: stamp.second() as u8,
            min: stamp.minute() as u8,
            hour: stamp.hour() as u8,
            day: stamp.day() as u8,
            month: stamp.month() as u8,
            year: stamp.year() as u16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heliograph::wire::MOD_ID;

    #[test]
    fn ping_identifies_the_module() {
        let mut bank = SensorBank::new(MOD_ID);
        assert_eq!(
            bank.service(Opcode::Ping, &[0; 5]),
            Reading::Pong { module_id: MOD_ID }
        );
    }

    #[test]
    fn toggle_flips_the_latch() {
        let mut bank = SensorBank::new(MOD_ID);
        assert_eq!(bank.service(Opcode::Toggle, &[0; 5]), Reading::Toggle(true));
        assert_eq!(bank.service(Opcode::Toggle, &[0; 5]), Reading::Toggle(false));
    }

    #[test]
    fn counter_increments_per_read() {
        let mut bank = SensorBank::new(MOD_ID);
        assert_eq!(bank.service(Opcode::ReadInt, &[0; 5]), Reading::Int(1));
        assert_eq!(bank.service(Opcode::ReadInt, &[0; 5]), Reading::Int(2));
    }

    #[test]
    fn set_clock_shifts_the_module_clock() {
        let mut bank = SensorBank::new(MOD_ID);

        // 2021-06-15 12:00:00 UTC.
        let mut args = [0u8; 5];
        args[0..4].copy_from_slice(&1623758400u32.to_be_bytes());

        match bank.service(Opcode::SetClock, &args) {
            Reading::Clock(clock) => {
                assert_eq!(clock.year, 2021);
                assert_eq!(clock.month, 6);
                assert_eq!(clock.day, 15);
                assert_eq!(clock.hour, 12);
                assert_eq!(clock.min, 0);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
