mod sensors;

use anyhow::Context;
use clap::Parser;
use heliograph::command::Opcode;
use heliograph::wire::MOD_ID;
use heliograph::{Error, SerialLink, Station};
use log::{debug, error, info, warn};

use sensors::SensorBank;

#[derive(Debug, Parser)]
struct Opt {
    /// Serial port of the module's radio.
    #[clap(short, long, default_value = "/dev/ttyUSB1")]
    port: String,
    #[clap(short, long, default_value_t = 9600)]
    baud: u32,
    /// Module id to answer as.
    #[clap(short, long, default_value_t = MOD_ID)]
    id: u16,
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::init();
    let opt = Opt::parse();

    let link = SerialLink::open(&opt.port, opt.baud)
        .with_context(|| format!("failed to open {}", opt.port))?;
    let mut station = Station::new_module(link, opt.id);
    let mut bank = SensorBank::new(opt.id);
    info!("module {:#06x} listening on {}", opt.id, opt.port);

    loop {
        let (frame, request) = match station.poll_request() {
            Ok(Some(polled)) => polled,
            Ok(None) => continue,
            Err(Error::Frame(err)) => {
                warn!("dropped frame: {}", err);
                continue;
            }
            Err(Error::Wire(err)) => {
                warn!("dropped unparseable request: {}", err);
                continue;
            }
            Err(err) => return Err(anyhow::anyhow!("link failed: {}", err)),
        };

        let opcode = match Opcode::try_from(request.cmd) {
            Ok(opcode) => opcode,
            Err(err) => {
                warn!("request from {:#x}: {}", frame.source_addr, err);
                continue;
            }
        };
        debug!("servicing {:?} for {:#x}", opcode, frame.source_addr);

        let reading = bank.service(opcode, &request.args);
        let payload = match reading.encode() {
            Ok(payload) => payload,
            Err(err) => {
                error!("could not encode {:?}: {}", reading, err);
                continue;
            }
        };
        if let Err(err) = station.respond(&frame, &payload) {
            error!("reply to {:#x} failed: {}", frame.source_addr, err);
        }
    }
}
