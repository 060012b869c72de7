//! Serial link to an IR transceiver device.
//!
//! [`SerialLink`] implements both [`CaptureSource`] and [`Transmitter`]: it
//! sends postcard-encoded [`Command`]s and, while a capture runs, pumps the
//! streamed [`Reply::Edge`] messages into the capture channel from a reader
//! thread.

use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, warn};
use serialport::SerialPort;

use crate::capture::{CaptureEvent, CaptureSource};
use crate::protocol::{Command, Reply};
use crate::{Error, Transmitter};

const BAUDRATE: u32 = 115_200;
const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

pub struct SerialLink {
    port: Option<Box<dyn SerialPort>>,
    reader: Option<ReaderHandle>,
}

struct ReaderHandle {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl SerialLink {
    pub fn new() -> Self {
        SerialLink { port: None, reader: None }
    }

    pub fn connect<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Error> {
        let path = path.as_ref().to_string_lossy();
        let port = serialport::new(path.as_ref(), BAUDRATE)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|err| Error::SourceUnavailable(format!("{}: {}", path, err)))?;
        self.port.replace(port);
        Ok(())
    }

    pub fn send_command(&mut self, cmd: &Command) -> Result<(), Error> {
        let req = postcard::to_stdvec(cmd).map_err(|err| Error::MalformedInput(err.to_string()))?;
        let port = self.port()?;
        port.write_all(&req)?;
        Ok(())
    }

    /// Read one reply, accumulating serial chunks until postcard accepts them.
    pub fn read_reply(&mut self, timeout: Duration) -> Result<Reply, Error> {
        let deadline = Instant::now() + timeout;
        let port = self.port()?;

        let mut buf = [0u8; 1024];
        let mut filled = 0;
        loop {
            match port.read(&mut buf[filled..]) {
                Ok(n) => filled += n,
                Err(ref err) if err.kind() == io::ErrorKind::TimedOut => {}
                Err(err) => return Err(err.into()),
            }
            if filled > 0 {
                if let Ok(reply) = postcard::from_bytes::<Reply>(&buf[..filled]) {
                    return Ok(reply);
                }
            }
            if Instant::now() >= deadline {
                return Err(Error::SourceUnavailable("no reply from transceiver".into()));
            }
        }
    }

    pub fn read_ok(&mut self, timeout: Duration) -> Result<(), Error> {
        match self.read_reply(timeout)? {
            Reply::Ok => Ok(()),
            other => Err(Error::SourceUnavailable(format!("unexpected reply: {:?}", other))),
        }
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>, Error> {
        self.port
            .as_mut()
            .ok_or_else(|| Error::SourceUnavailable("not connected".into()))
    }
}

impl Default for SerialLink {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSource for SerialLink {
    fn start(&mut self, pin: u8, watchdog_ms: u16) -> Result<Receiver<CaptureEvent>, Error> {
        self.send_command(&Command::Capture { pin, watchdog_ms })?;
        self.read_ok(REPLY_TIMEOUT)?;

        let reader_port = self
            .port()?
            .try_clone()
            .map_err(|err| Error::SourceUnavailable(err.to_string()))?;

        let stop = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();
        let thread = thread::spawn({
            let stop = stop.clone();
            move || pump_events(reader_port, tx, stop)
        });
        self.reader = Some(ReaderHandle { stop, thread });
        Ok(rx)
    }

    fn stop(&mut self) {
        if let Some(handle) = self.reader.take() {
            handle.stop.store(true, Ordering::Relaxed);
            let _ = handle.thread.join();
        }
        if self.port.is_some() {
            if let Err(err) = self.send_command(&Command::Idle) {
                warn!("failed to idle transceiver: {}", err);
            }
        }
    }
}

impl Transmitter for SerialLink {
    fn transmit(&mut self, pin: u8, code: &[u32]) -> Result<(), Error> {
        self.send_command(&Command::Transmit { pin, code: code.to_vec() })?;

        // The transceiver acknowledges after the whole code has played out.
        let playout: u64 = code.iter().map(|&n| u64::from(n)).sum();
        self.read_ok(Duration::from_micros(playout) + REPLY_TIMEOUT)
    }
}

fn pump_events(mut port: Box<dyn SerialPort>, events: Sender<CaptureEvent>, stop: Arc<AtomicBool>) {
    let mut buf = [0u8; 1024];
    let mut filled = 0usize;

    while !stop.load(Ordering::Relaxed) {
        match port.read(&mut buf[filled..]) {
            Ok(0) => continue,
            Ok(n) => filled += n,
            Err(ref err) if err.kind() == io::ErrorKind::TimedOut => continue,
            Err(err) => {
                debug!("serial read failed: {}", err);
                return;
            }
        }

        match drain_replies(&buf[..filled], &events) {
            Some(consumed) => {
                buf.copy_within(consumed..filled, 0);
                filled -= consumed;
                // A full buffer that still decodes to nothing is garbage.
                if filled == buf.len() {
                    filled = 0;
                }
            }
            None => return,
        }
    }
}

/// Decode as many complete replies as `buf` holds, forwarding capture events.
/// Returns the number of bytes consumed, or `None` once the event receiver
/// has gone away.
fn drain_replies(buf: &[u8], events: &Sender<CaptureEvent>) -> Option<usize> {
    let mut rest = buf;
    loop {
        match postcard::take_from_bytes::<Reply>(rest) {
            Ok((reply, tail)) => {
                rest = tail;
                let event = match reply {
                    Reply::Edge { rising, tick } => CaptureEvent::Edge { rising, tick },
                    Reply::Watchdog => CaptureEvent::Watchdog,
                    other => {
                        debug!("ignoring reply during capture: {:?}", other);
                        continue;
                    }
                };
                if events.send(event).is_err() {
                    return None;
                }
            }
            Err(postcard::Error::DeserializeUnexpectedEnd) => break,
            Err(err) => {
                if rest.is_empty() {
                    break;
                }
                debug!("resync after framing error: {}", err);
                rest = &rest[1..];
            }
        }
    }
    Some(buf.len() - rest.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_handles_split_replies() {
        let mut wire = Vec::new();
        wire.extend(postcard::to_stdvec(&Reply::Edge { rising: true, tick: 100 }).unwrap());
        wire.extend(postcard::to_stdvec(&Reply::Edge { rising: false, tick: 8960 }).unwrap());
        wire.extend(postcard::to_stdvec(&Reply::Watchdog).unwrap());

        let (tx, rx) = mpsc::channel();

        // First chunk ends mid-message.
        let split = wire.len() - 2;
        let consumed = drain_replies(&wire[..split], &tx).unwrap();
        let mut remainder = wire[consumed..split].to_vec();
        remainder.extend_from_slice(&wire[split..]);
        drain_replies(&remainder, &tx).unwrap();

        let got: Vec<CaptureEvent> = rx.try_iter().collect();
        assert_eq!(
            got,
            vec![
                CaptureEvent::Edge { rising: true, tick: 100 },
                CaptureEvent::Edge { rising: false, tick: 8960 },
                CaptureEvent::Watchdog,
            ]
        );
    }

    #[test]
    fn drain_stops_when_receiver_is_gone() {
        let wire = postcard::to_stdvec(&Reply::Watchdog).unwrap();
        let (tx, rx) = mpsc::channel();
        drop(rx);
        assert_eq!(drain_replies(&wire, &tx), None);
    }
}
