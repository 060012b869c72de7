//! Irpulse core: consumer infrared timing-code codec (AEHA, NEC, SONY),
//! edge-triggered capture state machine and named code store.
//!
//! The `utils` feature adds [`SerialLink`], a serial transceiver backend
//! implementing both capture and transmit.

pub mod capture;
pub mod codec;
pub mod protocol;
pub mod store;
pub mod timing;

#[cfg(feature = "utils")]
pub mod link;

pub use capture::{record, CaptureConfig, CaptureEvent, CaptureMachine, CaptureSource, CaptureState};
pub use codec::{decode, encode, frames_to_string, Format, Frame, FramesDocument, TimingCode};
pub use store::CodeStore;

#[cfg(feature = "utils")]
pub use link::SerialLink;

use thiserror::Error as ThisError;

/// Errors surfaced by capture, codec and persistence operations.
#[derive(Debug, ThisError)]
pub enum Error {
    /// The capture or transmit backend could not be reached.
    #[error("backend unavailable: {0}")]
    SourceUnavailable(String),
    /// Capture timed out without receiving a signal.
    #[error("no signal received before timeout")]
    NoData,
    /// The captured signal is too short to carry a frame.
    #[error("captured signal too short ({0} samples)")]
    ShortSignal(usize),
    /// Structurally invalid frames or an unrecognized format.
    #[error("malformed input: {0}")]
    MalformedInput(String),
    /// The code store could not be written.
    #[error("store write failed: {0}")]
    Persistence(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid document: {0}")]
    Document(#[from] serde_json::Error),
}

/// Waveform transmitter backend.
///
/// Plays a timing code on an output pin: every mark as a 38 kHz duty-cycled
/// pulse train of the given duration, every space as pin-low. Concurrent
/// transmissions on the same pin must be sequenced by the caller.
pub trait Transmitter {
    fn transmit(&mut self, pin: u8, code: &[u32]) -> Result<(), Error>;
}
