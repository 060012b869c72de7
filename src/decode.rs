use std::path::Path;

use anyhow::{anyhow, bail};

use irpulse_shared::{decode, frames_to_string, CodeStore, Format, FramesDocument};

use crate::vcdutils;

/// Decode a stored code and export the frames as json.
pub fn command_dec(store: &CodeStore, name: &str, file: &Path) -> anyhow::Result<()> {
    let code = store
        .get(name)
        .ok_or_else(|| anyhow!("no stored code named \"{}\"", name))?;

    println!("{:?}", code);
    let (format, frames) = decode(code);
    println!("{}", frames_to_string(format, &frames));

    if format == Format::Unknown {
        bail!("unrecognized format, nothing written");
    }

    let doc = FramesDocument { format, data: frames };
    doc.to_path(file)?;
    println!("Wrote {}", file.display());
    Ok(())
}

/// Decode a waveform stored in a vcd file.
pub fn command_playback(path: &Path) -> anyhow::Result<()> {
    let code = vcdutils::read_code(path)?;
    println!("{:?}", code);

    let (format, frames) = decode(&code);
    println!("{}", frames_to_string(format, &frames));
    Ok(())
}
