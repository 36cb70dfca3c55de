mod console;
mod manager;
mod modem;

use anyhow::Context;
use clap::Parser;
use heliograph::{SerialLink, Station};
use log::info;

use console::Console;
use manager::ModuleManager;
use modem::Modem;

#[derive(Debug, Parser)]
struct Opt {
    /// Serial port of the attached modem.
    #[clap(short, long, default_value = "/dev/ttyUSB0")]
    port: String,
    #[clap(short, long, default_value_t = 9600)]
    baud: u32,
    /// Assume the modem is already in API mode.
    #[clap(long)]
    skip_setup: bool,
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::init();
    let opt = Opt::parse();

    let link = SerialLink::open(&opt.port, opt.baud)
        .with_context(|| format!("failed to open {}", opt.port))?;

    let mut modem = Modem::new(link);
    if !opt.skip_setup {
        modem
            .enable_api_mode()
            .context("failed to switch the modem into API mode")?;
        info!("modem on {} switched to API mode", opt.port);
    }

    let station = Station::new_master(modem.into_link());
    let mut console = Console::new(ModuleManager::new(station));
    console.repl()?;
    Ok(())
}
