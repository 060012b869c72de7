use std::path::PathBuf;

use structopt::StructOpt;

use irpulse_shared::{CodeStore, SerialLink};

mod capture;
mod decode;
mod encode;
mod irsend;
mod vcdutils;

#[derive(Debug, StructOpt)]
#[structopt(name = "irpulse", about = "Capture, store and replay infrared remote codes")]
struct Opt {
    /// Serial transceiver device. Defaults to the first detected port
    #[structopt(long = "device", parse(from_os_str))]
    serial: Option<PathBuf>,
    /// Code store file
    #[structopt(short = "c", long = "codes", default_value = "codes.json", parse(from_os_str))]
    codes: PathBuf,
    #[structopt(short, long)]
    debug: bool,
    #[structopt(subcommand)]
    cmd: CliCommand,
}

#[derive(StructOpt, Debug)]
enum CliCommand {
    /// Record codes and store them under the given names
    Rec {
        /// Receiver pin on the transceiver
        #[structopt(long, default_value = "4")]
        pin: u8,
        /// Also dump the captured waveform to a vcd file
        #[structopt(long, parse(from_os_str))]
        vcd: Option<PathBuf>,
        names: Vec<String>,
    },
    /// Send stored codes
    Send {
        /// Transmitter pin on the transceiver
        #[structopt(long, default_value = "13")]
        pin: u8,
        /// Seconds to wait between codes
        #[structopt(short, long, default_value = "1")]
        wait: u64,
        names: Vec<String>,
    },
    /// List stored code names
    List,
    /// Delete stored codes
    Del { names: Vec<String> },
    /// Decode a stored code into a frames file (json)
    Dec {
        #[structopt(short, long, parse(from_os_str))]
        file: PathBuf,
        name: String,
    },
    /// Encode a frames file (json) and store the result
    Enc {
        #[structopt(short, long, parse(from_os_str))]
        file: PathBuf,
        name: String,
    },
    /// Decode a waveform from a vcd file
    Playback {
        #[structopt(parse(from_os_str))]
        path: PathBuf,
    },
    /// List available serial ports
    Ports,
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::from_args();

    let loglevel = if opt.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new().filter_level(loglevel).init();

    let mut store = CodeStore::load(&opt.codes);

    match opt.cmd {
        CliCommand::Rec { pin, vcd, names } => {
            let mut link = connect(&opt.serial)?;
            capture::command_rec(&mut link, &mut store, pin, vcd.as_deref(), &names)
        }
        CliCommand::Send { pin, wait, names } => {
            let mut link = connect(&opt.serial)?;
            irsend::command_send(&mut link, &store, pin, wait, &names)
        }
        CliCommand::List => {
            if store.is_empty() {
                println!("No stored codes");
            } else {
                for name in store.names() {
                    println!("{}", name);
                }
            }
            Ok(())
        }
        CliCommand::Del { names } => {
            for name in &names {
                if store.remove(name) {
                    store.save()?;
                    println!("Deleted \"{}\"", name);
                } else {
                    println!("No stored code named \"{}\"", name);
                }
            }
            Ok(())
        }
        CliCommand::Dec { file, name } => decode::command_dec(&store, &name, &file),
        CliCommand::Enc { file, name } => encode::command_enc(&mut store, &name, &file),
        CliCommand::Playback { path } => decode::command_playback(&path),
        CliCommand::Ports => {
            for port in serialport::available_ports()? {
                println!("{}", port.port_name);
            }
            Ok(())
        }
    }
}

fn connect(serial: &Option<PathBuf>) -> anyhow::Result<SerialLink> {
    let path = if let Some(path) = serial {
        path.clone()
    } else if let Ok(ports) = serialport::available_ports() {
        ports
            .first()
            .map(|port| PathBuf::from(&port.port_name))
            .unwrap_or_else(|| PathBuf::from("/dev/ttyACM0"))
    } else {
        PathBuf::from("/dev/ttyACM0")
    };

    let mut link = SerialLink::new();
    link.connect(&path)?;
    Ok(link)
}
