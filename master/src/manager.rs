//! Registry of known modules and the request plumbing behind the console.

use std::fs;
use std::io;
use std::path::Path;

use heliograph::command::{discovery_probe, Opcode, Reading};
use heliograph::wire::{BROADCAST_ADDR, DEER_FEEDER_ID, MOD_ID};
use heliograph::{Error as StationError, Link, Station};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where the registry is persisted between runs.
pub const REGISTRY_PATH: &str = ".modules";

/// Ingest attempts while waiting on a transmit status.
const STATUS_BUDGET: usize = 16;

/// Ingest attempts while waiting on a module reply.
const REPLY_BUDGET: usize = 32;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no modules registered; run discover first")]
    NoModules,
    #[error("unknown module: {0}")]
    UnknownModule(String),
    #[error("request not delivered (status {0:#04x})")]
    NotDelivered(u8),
    #[error("{0}")]
    Station(#[from] StationError<io::Error>),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Registry(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// One module known to this hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub id: u16,
    pub addr: u64,
    pub node_id: String,
}

impl ModuleRecord {
    pub fn kind(&self) -> &'static str {
        match self.id {
            MOD_ID => "prototype",
            DEER_FEEDER_ID => "deer-feeder",
            _ => "unknown",
        }
    }
}

/// Owns the master station and the registry of discovered modules.
pub struct ModuleManager<L: Link<Error = io::Error>> {
    station: Station<L>,
    pub modules: Vec<ModuleRecord>,
}

impl<L: Link<Error = io::Error>> ModuleManager<L> {
    pub fn new(station: Station<L>) -> Self {
        ModuleManager {
            station,
            modules: Vec::new(),
        }
    }

    /// Broadcasts the discovery ping and registers every module that answers
    /// before the link goes quiet. Returns how many replies were heard.
    pub fn discover(&mut self) -> Result<usize> {
        let frame_id = self
            .station
            .send_request(BROADCAST_ADDR, &discovery_probe())?;
        match self.station.await_status(frame_id, STATUS_BUDGET) {
            Ok(status) => debug!("discovery broadcast status: {:?}", status),
            // Broadcasts on a quiet mesh may never report back.
            Err(StationError::Timeout) => debug!("no status for discovery broadcast"),
            Err(err) => return Err(err.into()),
        }

        let mut heard = 0;
        loop {
            match self.station.await_receive(REPLY_BUDGET) {
                Ok(frame) => match Reading::decode(Opcode::Ping, &frame.rf_data) {
                    Ok(Reading::Pong { module_id }) => {
                        self.register(module_id, frame.source_addr);
                        heard += 1;
                    }
                    other => warn!(
                        "ignoring malformed discovery reply from {:#x}: {:?}",
                        frame.source_addr, other
                    ),
                },
                Err(StationError::Timeout) => break,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(heard)
    }

    fn register(&mut self, id: u16, addr: u64) {
        if let Some(record) = self.modules.iter_mut().find(|record| record.addr == addr) {
            record.id = id;
            return;
        }
        let record = ModuleRecord {
            id,
            addr,
            node_id: format!("node-{:x}", addr),
        };
        info!("registered {} module {}", record.kind(), record.node_id);
        self.modules.push(record);
    }

    /// Case-insensitive lookup by node id.
    pub fn find(&self, node_id: &str) -> Option<usize> {
        let wanted = node_id.to_lowercase();
        self.modules
            .iter()
            .position(|record| record.node_id.to_lowercase() == wanted)
    }

    /// Sends one command to a registered module and decodes its reply.
    pub fn request(&mut self, index: usize, opcode: Opcode, args: &[u8]) -> Result<Reading> {
        let target = self.modules.get(index).ok_or(Error::NoModules)?.clone();
        let request = opcode
            .request_with_args(target.id, args)
            .map_err(StationError::Wire)?;

        let frame_id = self.station.send_request(target.addr, &request)?;
        let status = self.station.await_status(frame_id, STATUS_BUDGET)?;
        if !status.delivered() {
            return Err(Error::NotDelivered(status.delivery_status));
        }

        let mut reply = self.station.await_receive(REPLY_BUDGET)?;
        while reply.source_addr != target.addr {
            debug!("dropping reply from unrelated node {:#x}", reply.source_addr);
            reply = self.station.await_receive(REPLY_BUDGET)?;
        }
        Ok(Reading::decode(opcode, &reply.rf_data).map_err(StationError::Wire)?)
    }

    /// Sets a module's wall clock to `epoch` seconds.
    pub fn set_clock(&mut self, index: usize, epoch: u32) -> Result<Reading> {
        let mut args = [0u8; 5];
        args[0..4].copy_from_slice(&epoch.to_be_bytes());
        self.request(index, Opcode::SetClock, &args)
    }

    /// Saves the registry to disk.
    pub fn save(&self) -> Result<()> {
        let rendered = serde_yaml::to_string(&self.modules)?;
        fs::write(REGISTRY_PATH, rendered)?;
        Ok(())
    }

    /// Loads a previously saved registry.
    pub fn load(&mut self) -> Result<()> {
        self.modules = load_registry(REGISTRY_PATH)?;
        Ok(())
    }
}

fn load_registry(path: impl AsRef<Path>) -> Result<Vec<ModuleRecord>> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_roundtrips_through_yaml() {
        let modules = vec![
            ModuleRecord {
                id: MOD_ID,
                addr: 0x0013a200deadbeef,
                node_id: "node-13a200deadbeef".to_string(),
            },
            ModuleRecord {
                id: DEER_FEEDER_ID,
                addr: 0x0013a200cafe0042,
                node_id: "node-13a200cafe0042".to_string(),
            },
        ];

        let rendered = serde_yaml::to_string(&modules).unwrap();
        let path = std::env::temp_dir().join("heliograph-registry-test.yaml");
        fs::write(&path, rendered).unwrap();
        let loaded = load_registry(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(loaded, modules);
        assert_eq!(loaded[0].kind(), "prototype");
        assert_eq!(loaded[1].kind(), "deer-feeder");
    }
}
