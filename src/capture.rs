use std::path::Path;

use anyhow::Context;
use log::info;

use irpulse_shared::{decode, frames_to_string, record, CaptureConfig, CodeStore, Error, SerialLink};

use crate::vcdutils;

/// Record one code per name, decode it for inspection and store it.
pub fn command_rec(
    link: &mut SerialLink,
    store: &mut CodeStore,
    pin: u8,
    vcd: Option<&Path>,
    names: &[String],
) -> anyhow::Result<()> {
    let config = CaptureConfig::default();

    for name in names {
        println!("Recording \"{}\": point the remote at the receiver and press a button", name);

        match record(link, pin, &config) {
            Ok(code) => {
                info!("captured {} samples", code.len());
                println!("{:?}", code);

                let (format, frames) = decode(&code);
                println!("{}", frames_to_string(format, &frames));

                if let Some(path) = vcd {
                    vcdutils::write_code(path, &code)
                        .with_context(|| format!("writing {}", path.display()))?;
                }

                store.insert(name, code);
                store
                    .save()
                    .with_context(|| format!("saving {}", store.path().display()))?;
                println!("Stored code \"{}\"", name);
            }
            Err(Error::NoData) => println!("No signal received"),
            Err(Error::ShortSignal(len)) => {
                println!("Signal too short ({} samples), not stored", len)
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}
