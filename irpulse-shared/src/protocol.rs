//! Wire protocol spoken with a serial IR transceiver.
//!
//! Commands and replies travel postcard-encoded over the serial link. Edge
//! events stream as individual [`Reply::Edge`] messages while a capture is
//! running.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Command {
    /// Stop whatever is running and go quiet.
    Idle,
    Info,
    /// Start streaming edge events from the receiver on `pin`.
    Capture { pin: u8, watchdog_ms: u16 },
    /// Play a timing code on `pin` as a 38 kHz modulated waveform.
    Transmit { pin: u8, code: Vec<u32> },
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Info { version: u32, features: u32 },
    /// Edge transition, wrapping microsecond timestamp.
    Edge { rising: bool, tick: u32 },
    /// No edge within the watchdog window.
    Watchdog,
}

#[cfg(all(test, feature = "utils"))]
mod tests {
    use super::*;

    #[test]
    fn commands_roundtrip_through_postcard() {
        let cmds = vec![
            Command::Idle,
            Command::Capture { pin: 4, watchdog_ms: 100 },
            Command::Transmit { pin: 13, code: vec![8960, 4480, 560] },
        ];
        for cmd in cmds {
            let bytes = postcard::to_stdvec(&cmd).unwrap();
            assert_eq!(postcard::from_bytes::<Command>(&bytes).unwrap(), cmd);
        }
    }

    #[test]
    fn replies_roundtrip_through_postcard() {
        let replies = vec![
            Reply::Ok,
            Reply::Edge { rising: true, tick: 123_456 },
            Reply::Watchdog,
        ];
        for reply in replies {
            let bytes = postcard::to_stdvec(&reply).unwrap();
            assert_eq!(postcard::from_bytes::<Reply>(&bytes).unwrap(), reply);
        }
    }
}
