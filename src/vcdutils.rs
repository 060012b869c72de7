//! Timing codes as vcd waveforms, for inspection in a wave viewer and for
//! offline decoding.

use std::fs::File;
use std::io;
use std::io::ErrorKind::InvalidInput;
use std::path::Path;

use vcd::{SimulationCommand, TimescaleUnit, Value};

/// Write a timing code as a single-wire waveform, 1 us timescale. The code
/// starts with a mark, so the wire goes high at t=0.
pub fn write_code(path: &Path, code: &[u32]) -> io::Result<()> {
    let mut file = File::create(path)?;
    let mut writer = vcd::Writer::new(&mut file);

    writer.timescale(1, TimescaleUnit::US)?;
    writer.add_module("top")?;
    let wire = writer.add_wire(1, "ir")?;
    writer.upscope()?;
    writer.enddefinitions()?;

    writer.begin(SimulationCommand::Dumpvars)?;
    writer.change_scalar(wire, Value::V0)?;
    writer.end()?;

    writer.timestamp(0)?;
    writer.change_scalar(wire, Value::V1)?;

    let mut ts: u64 = 0;
    let mut level = true;
    for &duration in code {
        ts += u64::from(duration);
        level = !level;
        writer.timestamp(ts)?;
        writer.change_scalar(wire, if level { Value::V1 } else { Value::V0 })?;
    }

    Ok(())
}

/// Read a timing code back from a vcd file written by [`write_code`] (or any
/// file with a `top.ir` wire). Durations before the first rising edge are
/// skipped.
pub fn read_code(path: &Path) -> io::Result<Vec<u32>> {
    let file = File::open(path)?;
    let mut parser = vcd::Parser::new(&file);

    let header = parser.parse_header()?;
    let wire = header
        .find_var(&["top", "ir"])
        .ok_or_else(|| io::Error::new(InvalidInput, "no wire top.ir"))?
        .code;

    let mut code = Vec::new();
    let mut current_ts: u64 = 0;
    let mut last_edge: Option<u64> = None;

    for command in parser {
        use vcd::Command::*;
        match command? {
            Timestamp(ts) => current_ts = ts,
            ChangeScalar(id, value) if id == wire => match last_edge {
                None => {
                    if value == Value::V1 {
                        last_edge = Some(current_ts);
                    }
                }
                Some(prev) => {
                    code.push((current_ts - prev) as u32);
                    last_edge = Some(current_ts);
                }
            },
            _ => (),
        }
    }

    Ok(code)
}
