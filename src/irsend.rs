use std::thread;
use std::time::Duration;

use log::info;

use irpulse_shared::{CodeStore, SerialLink, Transmitter};

/// Send stored codes in order, pausing `wait` seconds between them.
pub fn command_send(
    link: &mut SerialLink,
    store: &CodeStore,
    pin: u8,
    wait: u64,
    names: &[String],
) -> anyhow::Result<()> {
    let mut first = true;

    for name in names {
        if !first {
            thread::sleep(Duration::from_secs(wait));
        }
        first = false;

        match store.get(name) {
            Some(code) => {
                info!("sending \"{}\" ({} samples)", name, code.len());
                link.transmit(pin, code)?;
                println!("Sent \"{}\"", name);
            }
            None => println!("No stored code named \"{}\"", name),
        }
    }

    Ok(())
}
