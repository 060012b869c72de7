use std::path::Path;

use anyhow::Context;

use irpulse_shared::{encode, CodeStore, FramesDocument};

/// Encode a frames file and store the resulting code.
pub fn command_enc(store: &mut CodeStore, name: &str, file: &Path) -> anyhow::Result<()> {
    let doc = FramesDocument::from_path(file)
        .with_context(|| format!("reading {}", file.display()))?;

    let code = encode(doc.format, &doc.data)?;
    println!("{:?}", code);

    store.insert(name, code);
    store
        .save()
        .with_context(|| format!("saving {}", store.path().display()))?;
    println!("Stored code \"{}\"", name);
    Ok(())
}
