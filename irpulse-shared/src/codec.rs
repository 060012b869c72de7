//! Timing-code codec for the AEHA, NEC and SONY infrared formats.
//!
//! A timing code is a list of microsecond durations, alternating mark
//! (carrier on) and space (carrier off), always starting with a mark.
//! [`encode`] turns byte-oriented frames into a timing code, [`decode`] does
//! the reverse. Decoding is all-or-nothing: a single pairing that matches no
//! known shape rejects the whole code.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::mem;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::timing::{round_to, within_tolerance, DEFAULT_TOLERANCE, T_AEHA, T_NEC, T_SONY, T_WAIT};
use crate::Error;

/// Alternating mark/space durations in microseconds.
pub type TimingCode = Vec<u32>;

/// One logical data unit of a transmission.
///
/// For AEHA and NEC this is a byte sequence (LSB first on the wire); an empty
/// frame is a repeat code. For SONY it is exactly two elements,
/// `[value & 0x7F, value >> 7]` of the combined 12/15/20 bit data word.
pub type Frame = Vec<u16>;

/// Supported infrared formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Format {
    Unknown,
    #[serde(rename = "AEHA")]
    Aeha,
    #[serde(rename = "NEC")]
    Nec,
    #[serde(rename = "SONY")]
    Sony,
}

impl Format {
    /// Base time unit in microseconds, `None` for [`Format::Unknown`].
    pub fn unit(self) -> Option<u32> {
        match self {
            Format::Aeha => Some(T_AEHA),
            Format::Nec => Some(T_NEC),
            Format::Sony => Some(T_SONY),
            Format::Unknown => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Format::Unknown => "Unknown",
            Format::Aeha => "AEHA",
            Format::Nec => "NEC",
            Format::Sony => "SONY",
        };
        f.write_str(name)
    }
}

/// Decoded frames together with their format, the unit exchanged with the
/// frames file (`dec`/`enc`) and the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramesDocument {
    pub format: Format,
    pub data: Vec<Frame>,
}

impl FramesDocument {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path.as_ref())?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let file = File::create(path.as_ref())?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}

fn near(length: u32, target: u32) -> bool {
    within_tolerance(length, target, DEFAULT_TOLERANCE)
}

fn unknown() -> (Format, Vec<Frame>) {
    (Format::Unknown, Vec::new())
}

/// Encode `frames` as a timing code.
///
/// Frames must be non-empty; repeat frames cannot be synthesized. The NEC and
/// SONY inter-frame wait is derived from the unit count of the previous frame.
pub fn encode(format: Format, frames: &[Frame]) -> Result<TimingCode, Error> {
    let t = format
        .unit()
        .ok_or_else(|| Error::MalformedInput("cannot encode Unknown format".into()))?;
    if frames.is_empty() {
        return Err(Error::MalformedInput("no frames to encode".into()));
    }

    let mut code = TimingCode::new();
    let mut t_count: u32 = 0;

    for (n, frame) in frames.iter().enumerate() {
        if frame.is_empty() {
            return Err(Error::MalformedInput(format!("frame #{} is empty", n + 1)));
        }

        // Inter-frame wait, sized by the previous frame's unit count.
        if n > 0 {
            let wait = match format {
                Format::Aeha => T_WAIT,
                Format::Nec => round_to(108_000u32.saturating_sub(t * t_count), 100),
                Format::Sony => round_to(45_000u32.saturating_sub(t * t_count), 100),
                Format::Unknown => unreachable!(),
            };
            code.push(wait);
        }
        t_count = 0;

        // Leader
        match format {
            Format::Aeha => {
                code.push(t * 8);
                code.push(t * 4);
                t_count += 12;
            }
            Format::Nec => {
                code.push(t * 16);
                code.push(t * 8);
                t_count += 24;
            }
            Format::Sony => {
                code.push(t * 4);
                t_count += 4;
            }
            Format::Unknown => unreachable!(),
        }

        // Data bits, LSB first
        match format {
            Format::Aeha | Format::Nec => {
                for &byte in frame {
                    if byte > 0xFF {
                        return Err(Error::MalformedInput(format!(
                            "value {:#x} in frame #{} is not a byte",
                            byte,
                            n + 1
                        )));
                    }
                    let mut d = byte;
                    for _ in 0..8 {
                        code.push(t);
                        if d & 1 == 0 {
                            code.push(t);
                            t_count += 2;
                        } else {
                            code.push(t * 3);
                            t_count += 4;
                        }
                        d >>= 1;
                    }
                }
                // Stop bit
                code.push(t);
            }
            Format::Sony => {
                if frame.len() != 2 || frame[0] > 0x7F {
                    return Err(Error::MalformedInput(format!(
                        "frame #{} is not a SONY [low7, high] pair",
                        n + 1
                    )));
                }
                let mut d = u32::from(frame[0]) | (u32::from(frame[1]) << 7);
                let bits = if frame[1] >= 0x100 {
                    20
                } else if frame[1] >= 0x20 {
                    15
                } else {
                    12
                };
                for _ in 0..bits {
                    code.push(t);
                    if d & 1 == 0 {
                        code.push(t);
                        t_count += 2;
                    } else {
                        code.push(t * 2);
                        t_count += 3;
                    }
                    d >>= 1;
                }
            }
            Format::Unknown => unreachable!(),
        }
    }

    Ok(code)
}

/// Decode a timing code into its format and frames.
///
/// Any validation failure yields `(Format::Unknown, vec![])`; decoding never
/// partially succeeds.
pub fn decode(code: &[u32]) -> (Format, Vec<Frame>) {
    if code.len() < 10 {
        return unknown();
    }

    if near(code[0], T_AEHA * 8) && near(code[1], T_AEHA * 4) {
        decode_pulse_distance(code, Format::Aeha, T_AEHA)
    } else if near(code[0], T_NEC * 16) && near(code[1], T_NEC * 8) {
        decode_pulse_distance(code, Format::Nec, T_NEC)
    } else if near(code[0], T_SONY * 4) && near(code[1], T_SONY) {
        decode_sony(code)
    } else {
        unknown()
    }
}

/// AEHA and NEC share the pulse-distance walk; only the leader and repeat
/// space lengths differ.
fn decode_pulse_distance(code: &[u32], format: Format, t: u32) -> (Format, Vec<Frame>) {
    let (leader_mark, leader_space, repeat_space) = match format {
        Format::Aeha => (t * 8, t * 4, t * 8),
        Format::Nec => (t * 16, t * 8, t * 4),
        _ => return unknown(),
    };

    let mut frames: Vec<Frame> = Vec::new();
    let mut byte_list = Frame::new();
    let mut byte: u16 = 0;
    let mut bit_counter: u8 = 0;
    let mut end_of_frame = false;

    let mut i = 2;
    while i < code.len() {
        if end_of_frame {
            // A boundary on the final element leaves no room for a frame.
            if i == code.len() - 1 {
                return unknown();
            }
            let boundary = near(code[i], leader_mark)
                && (near(code[i + 1], leader_space) || near(code[i + 1], repeat_space));
            if !boundary {
                return unknown();
            }
            end_of_frame = false;
            i += 2;
            continue;
        }

        if i == code.len() - 1 {
            // Trailing stop mark, only valid on a byte boundary.
            if near(code[i], t) && bit_counter == 0 {
                frames.push(byte_list);
                return (format, frames);
            }
            return unknown();
        }

        let mark = code[i];
        let space = code[i + 1];

        // A stop mark followed by a long space ends the current frame.
        if near(mark, t) && space > T_WAIT / 2 {
            frames.push(mem::take(&mut byte_list));
            byte = 0;
            end_of_frame = true;
            i += 2;
            continue;
        }

        if near(mark, t) && near(space, t) {
            bit_counter = (bit_counter + 1) % 8;
        } else if near(mark, t) && near(space, t * 3) {
            byte |= 1 << bit_counter;
            bit_counter = (bit_counter + 1) % 8;
        } else {
            return unknown();
        }
        if bit_counter == 0 {
            byte_list.push(byte);
            byte = 0;
        }
        i += 2;
    }

    // Ran out of elements without a stop mark.
    unknown()
}

fn decode_sony(code: &[u32]) -> (Format, Vec<Frame>) {
    let t = T_SONY;

    // A well-formed SONY code is odd-length: leader mark plus space/mark pairs.
    if code.len() % 2 == 0 {
        return unknown();
    }

    let mut frames: Vec<Frame> = Vec::new();
    let mut value: u32 = 0;
    let mut bit_counter: u32 = 0;

    let mut i = 1;
    while i + 1 < code.len() {
        let space = code[i];
        let mark = code[i + 1];

        // A long space followed by a fresh leader mark starts the next frame.
        if space > T_WAIT / 2 && near(mark, t * 4) && i + 3 <= code.len() {
            frames.push(split_sony_value(value));
            value = 0;
            bit_counter = 0;
            i += 2;
            continue;
        }

        if near(space, t) && near(mark, t) {
            bit_counter += 1;
        } else if near(space, t) && near(mark, t * 2) {
            if bit_counter >= 32 {
                return unknown();
            }
            value |= 1 << bit_counter;
            bit_counter += 1;
        } else {
            return unknown();
        }
        i += 2;
    }

    // SONY words are exactly 12, 15 or 20 bits.
    if bit_counter == 12 || bit_counter == 15 || bit_counter == 20 {
        frames.push(split_sony_value(value));
        (Format::Sony, frames)
    } else {
        unknown()
    }
}

fn split_sony_value(value: u32) -> Frame {
    vec![(value & 0x7F) as u16, (value >> 7) as u16]
}

/// Render decoded frames as text: a format header, then one line per frame
/// with its bytes in hex, or `Repeat` for an empty frame.
pub fn frames_to_string(format: Format, frames: &[Frame]) -> String {
    use std::fmt::Write;

    let mut s = format!("Format {}\n", format);
    for (n, frame) in frames.iter().enumerate() {
        let _ = write!(s, "Frame#{}", n + 1);
        if frame.is_empty() {
            s.push_str(" Repeat");
        } else {
            for (j, byte) in frame.iter().enumerate() {
                let sep = if j == 0 { ' ' } else { ',' };
                let _ = write!(s, "{} 0x{:02X}", sep, byte);
            }
        }
        s.push('\n');
    }
    s
}
