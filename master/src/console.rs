//! Interactive console: scan for modules and talk to them.

use std::io::{self, Write};

use chrono::{TimeZone, Utc};
use heliograph::command::{ClockReading, Opcode, Reading};
use heliograph::SerialLink;
use thiserror::Error;

use crate::manager::{self, ModuleManager};

pub type Result<T> = std::result::Result<T, Error>;
type Handler = fn(&mut Console, &Args) -> Result<()>;

/// Command table: name, handler, help line.
const COMMANDS: &[(&str, Handler, &str)] = &[
    ("clear", do_clear, "Clear the screen"),
    ("discover", do_discover, "Discover modules on the network"),
    ("exit", do_exit, "Exit interactive mode"),
    ("help", do_help, "Display this screen"),
    ("list", do_list, "List all known modules"),
    ("load", do_load, "Load previously saved modules"),
    ("save", do_save, "Save current modules to disk"),
    ("send", do_send, "Send a command to a module"),
];

const SEND_USAGE: &str =
    "usage: send <module> request <ping|toggle|int|float|th|clock|dist|motor> | send <module> set clock";

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid command; try help")]
    InvalidCommand,
    #[error("{0}")]
    InvalidArgs(String),
    #[error("{0}")]
    Manager(#[from] manager::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug)]
pub struct Args {
    pub sub: Vec<String>,
}

/// Splits an input line into a command word and its arguments.
fn parse_line(input: &str) -> Option<(String, Args)> {
    let mut words = input.split_whitespace().map(str::to_lowercase);
    let command = words.next()?;
    Some((command, Args { sub: words.collect() }))
}

/// Maps a console reading name onto its opcode.
fn reading_opcode(name: &str) -> Option<Opcode> {
    match name {
        "ping" => Some(Opcode::Ping),
        "toggle" => Some(Opcode::Toggle),
        "int" => Some(Opcode::ReadInt),
        "float" => Some(Opcode::ReadFloat),
        "th" => Some(Opcode::TempHumidity),
        "clock" => Some(Opcode::Clock),
        "dist" => Some(Opcode::Distance),
        "motor" => Some(Opcode::Motor),
        _ => None,
    }
}

fn print_reading(reading: &Reading) {
    match *reading {
        Reading::Pong { module_id } => println!("Module id: {:#06x}", module_id),
        Reading::Toggle(state) => println!("Latch: {}", if state { "on" } else { "off" }),
        Reading::Int(value) => println!("Counter: {}", value),
        Reading::Float(value) => println!("Value: {}", value),
        Reading::TempHumidity { celsius, percent } => {
            println!("Temperature: {}C\nHumidity: {}%", celsius, percent)
        }
        Reading::Clock(clock) => print_clock(&clock),
        Reading::Distance { centimeters } => println!(
            "Detected distance: {:.2}cm/{:.2}in",
            centimeters,
            centimeters * 0.39
        ),
        Reading::MotorAck => println!("Motor acknowledged"),
    }
}

fn print_clock(clock: &ClockReading) {
    let stamp = Utc
        .with_ymd_and_hms(
            clock.year as i32,
            clock.month as u32,
            clock.day as u32,
            clock.hour as u32,
            clock.min as u32,
            clock.sec as u32,
        )
        .single();
    match stamp {
        Some(stamp) => println!("Module time: {}", stamp.format("%Y-%m-%d %H:%M:%S")),
        None => println!("Module time is not a valid date: {:?}", clock),
    }
}

fn do_send(con: &mut Console, args: &Args) -> Result<()> {
    if args.sub.len() < 3 {
        return Err(Error::InvalidArgs(SEND_USAGE.to_string()));
    }
    let target = con
        .manager
        .find(&args.sub[0])
        .ok_or_else(|| Error::Manager(manager::Error::UnknownModule(args.sub[0].clone())))?;

    match args.sub[1].as_str() {
        "request" => {
            let opcode = reading_opcode(&args.sub[2])
                .ok_or_else(|| Error::InvalidArgs(SEND_USAGE.to_string()))?;
            let reading = con.manager.request(target, opcode, &[])?;
            print_reading(&reading);
        }
        "set" => {
            if args.sub[2] != "clock" {
                return Err(Error::InvalidArgs(SEND_USAGE.to_string()));
            }
            let reading = con.manager.set_clock(target, Utc::now().timestamp() as u32)?;
            print_reading(&reading);
        }
        _ => return Err(Error::InvalidArgs(SEND_USAGE.to_string())),
    }
    Ok(())
}

fn do_discover(con: &mut Console, args: &Args) -> Result<()> {
    let heard = con.manager.discover()?;
    println!("{} module(s) answered", heard);

    if args.sub.iter().any(|sub| sub == "save") {
        do_save(con, args)?;
    }
    Ok(())
}

fn do_save(con: &mut Console, _args: &Args) -> Result<()> {
    if con.manager.modules.is_empty() {
        println!("no modules found");
    } else {
        con.manager.save()?;
        println!("saved");
    }
    Ok(())
}

fn do_load(con: &mut Console, _args: &Args) -> Result<()> {
    con.manager.load()?;
    println!("loaded");
    Ok(())
}

fn do_list(con: &mut Console, args: &Args) -> Result<()> {
    if args.sub.iter().any(|sub| sub == "clear") {
        con.manager.modules.clear();
        println!("cleared");
        return Ok(());
    }

    if con.manager.modules.is_empty() {
        return Err(Error::Manager(manager::Error::NoModules));
    }
    println!("\nModules:");
    for record in con.manager.modules.iter() {
        println!(
            "  {}  id {:#06x} ({})  addr {:#018x}",
            record.node_id,
            record.id,
            record.kind(),
            record.addr
        );
    }
    Ok(())
}

fn do_clear(_con: &mut Console, _args: &Args) -> Result<()> {
    println!("\x1B[2J");
    Ok(())
}

fn do_exit(con: &mut Console, _args: &Args) -> Result<()> {
    con.running = false;
    println!("goodbye");
    Ok(())
}

fn do_help(_con: &mut Console, _args: &Args) -> Result<()> {
    println!("Module hub console\n\nValid commands:");
    for (name, _, help) in COMMANDS {
        println!("  {:<10} {}", name, help);
    }
    Ok(())
}

pub struct Console {
    prompt: String,
    input: String,
    pub manager: ModuleManager<SerialLink>,
    running: bool,
}

impl Console {
    pub fn new(manager: ModuleManager<SerialLink>) -> Self {
        Console {
            prompt: "mm> ".to_string(),
            input: String::new(),
            manager,
            running: true,
        }
    }

    pub fn repl(&mut self) -> Result<()> {
        while self.running {
            self.input.clear();
            print!("{}", self.prompt);
            io::stdout().flush()?;
            if io::stdin().read_line(&mut self.input)? == 0 {
                // EOF behaves like exit.
                self.running = false;
                break;
            }
            if let Err(err) = self.process_input() {
                println!("{}", err);
            }
        }
        Ok(())
    }

    fn process_input(&mut self) -> Result<()> {
        let (command, args) = match parse_line(&self.input) {
            Some(parsed) => parsed,
            None => return Ok(()),
        };
        match COMMANDS.iter().find(|(name, _, _)| *name == command) {
            Some((_, handler, _)) => handler(self, &args),
            None => Err(Error::InvalidCommand),
        }
    }
}
