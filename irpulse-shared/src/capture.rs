//! Edge-triggered capture of infrared timing codes.
//!
//! The backend delivers edge events from its own thread through an mpsc
//! channel; [`record`] consumes them in the foreground, stepping a
//! [`CaptureMachine`] and polling at a coarse interval until the signal ends
//! or the overall timeout expires.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use log::debug;

use crate::timing::{round_to, DEFAULT_MAX_GAP};
use crate::Error;

/// Event delivered by a capture backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEvent {
    /// Edge transition on the receiver pin. `tick` is a wrapping
    /// microsecond timestamp.
    Edge { rising: bool, tick: u32 },
    /// The inactivity watchdog fired: no edge within the configured window.
    Watchdog,
}

/// Source of edge events, e.g. a serial transceiver or a GPIO driver.
pub trait CaptureSource {
    /// Begin monitoring `pin` and deliver events on the returned channel.
    ///
    /// The watchdog window applies from the first observed edge; a source
    /// that arms it earlier is also fine, the state machine ignores expiries
    /// before the signal starts. Fails with [`Error::SourceUnavailable`] if
    /// the backend cannot be acquired.
    fn start(&mut self, pin: u8, watchdog_ms: u16) -> Result<Receiver<CaptureEvent>, Error>;

    /// Stop monitoring and tear down the delivery thread.
    fn stop(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Armed,
    Recording,
    Done,
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Inter-edge gap above which the signal is considered finished.
    pub max_gap_us: u32,
    /// Inactivity watchdog window handed to the backend.
    pub watchdog_ms: u16,
    /// Overall capture timeout.
    pub timeout: Duration,
    /// Completion poll interval of the foreground loop.
    pub poll_interval: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            max_gap_us: DEFAULT_MAX_GAP,
            watchdog_ms: 100,
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// State machine reconstructing a timing code from edge events.
///
/// The first edge only starts the clock; every following edge appends the
/// gap since its predecessor, rounded to damp jitter. Tick arithmetic wraps,
/// so timer rollover between two edges is harmless.
#[derive(Debug)]
pub struct CaptureMachine {
    state: CaptureState,
    code: Vec<u32>,
    last_tick: Option<u32>,
    max_gap_us: u32,
}

impl CaptureMachine {
    pub fn new(max_gap_us: u32) -> Self {
        CaptureMachine {
            state: CaptureState::Idle,
            code: Vec::new(),
            last_tick: None,
            max_gap_us,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn code(&self) -> &[u32] {
        &self.code
    }

    pub fn take_code(&mut self) -> Vec<u32> {
        std::mem::take(&mut self.code)
    }

    /// Reset and wait for the first edge.
    pub fn arm(&mut self) {
        self.state = CaptureState::Armed;
        self.code.clear();
        self.last_tick = None;
    }

    pub fn handle(&mut self, event: CaptureEvent) -> CaptureState {
        match event {
            CaptureEvent::Edge { tick, .. } => self.edge(tick),
            CaptureEvent::Watchdog => self.watchdog(),
        }
        self.state
    }

    /// Overall timeout elapsed without the signal completing.
    pub fn expire(&mut self) {
        if self.state != CaptureState::Done {
            self.state = CaptureState::TimedOut;
        }
    }

    fn edge(&mut self, tick: u32) {
        match self.state {
            CaptureState::Armed => {
                self.state = CaptureState::Recording;
                self.last_tick = Some(tick);
            }
            CaptureState::Recording => {
                let last = match self.last_tick {
                    Some(last) => last,
                    None => {
                        self.last_tick = Some(tick);
                        return;
                    }
                };
                let gap = tick.wrapping_sub(last);
                if gap > self.max_gap_us {
                    // End of signal; this edge belongs to whatever follows.
                    self.state = CaptureState::Done;
                    return;
                }
                let gap = if gap < 1000 {
                    round_to(gap, 10)
                } else if gap < 2000 {
                    round_to(gap, 50)
                } else {
                    round_to(gap, 200)
                };
                self.code.push(gap);
                self.last_tick = Some(tick);
            }
            _ => {}
        }
    }

    fn watchdog(&mut self) {
        // Silence after the signal started means end of transmission.
        if self.state == CaptureState::Recording {
            self.state = CaptureState::Done;
        }
    }
}

/// Capture one timing code from `source`.
///
/// Returns the code when it holds more than 10 samples; shorter completed
/// captures fail with [`Error::ShortSignal`], and a capture that never
/// completes within the timeout fails with [`Error::NoData`].
pub fn record<S: CaptureSource>(
    source: &mut S,
    pin: u8,
    config: &CaptureConfig,
) -> Result<Vec<u32>, Error> {
    let events = source.start(pin, config.watchdog_ms)?;

    let mut machine = CaptureMachine::new(config.max_gap_us);
    machine.arm();

    let deadline = Instant::now() + config.timeout;
    loop {
        let now = Instant::now();
        if now >= deadline {
            machine.expire();
            break;
        }
        let wait = config.poll_interval.min(deadline - now);
        match events.recv_timeout(wait) {
            Ok(event) => {
                if machine.handle(event) == CaptureState::Done {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                // The delivery thread went away; treat the silence like a
                // watchdog expiry.
                machine.handle(CaptureEvent::Watchdog);
                if machine.state() != CaptureState::Done {
                    machine.expire();
                }
                break;
            }
        }
    }
    source.stop();

    match machine.state() {
        CaptureState::Done => {
            let code = machine.take_code();
            debug!("capture finished with {} samples", code.len());
            if code.len() > 10 {
                Ok(code)
            } else {
                Err(Error::ShortSignal(code.len()))
            }
        }
        _ => Err(Error::NoData),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread::{self, JoinHandle};

    fn edge(tick: u32) -> CaptureEvent {
        CaptureEvent::Edge { rising: tick % 2 == 0, tick }
    }

    #[test]
    fn first_edge_records_nothing() {
        let mut m = CaptureMachine::new(DEFAULT_MAX_GAP);
        m.arm();
        assert_eq!(m.handle(edge(1000)), CaptureState::Recording);
        assert!(m.code().is_empty());
    }

    #[test]
    fn adaptive_rounding() {
        let mut m = CaptureMachine::new(DEFAULT_MAX_GAP);
        m.arm();
        m.handle(edge(0));
        m.handle(edge(432)); // < 1000: nearest 10
        m.handle(edge(432 + 1432)); // < 2000: nearest 50
        m.handle(edge(432 + 1432 + 2510)); // >= 2000: nearest 200
        assert_eq!(m.code(), &[430, 1450, 2600]);
    }

    #[test]
    fn tick_wraparound() {
        let mut m = CaptureMachine::new(DEFAULT_MAX_GAP);
        m.arm();
        m.handle(edge(u32::MAX - 100));
        m.handle(edge(399));
        assert_eq!(m.code(), &[500]);
    }

    #[test]
    fn long_gap_ends_recording_and_discards_edge() {
        let mut m = CaptureMachine::new(DEFAULT_MAX_GAP);
        m.arm();
        m.handle(edge(0));
        m.handle(edge(600));
        m.handle(edge(1200));
        assert_eq!(m.handle(edge(1200 + 40_000)), CaptureState::Done);
        assert_eq!(m.code(), &[600, 600]);
        // Further edges are ignored once done.
        m.handle(edge(50_000));
        assert_eq!(m.code(), &[600, 600]);
    }

    #[test]
    fn watchdog_only_matters_while_recording() {
        let mut m = CaptureMachine::new(DEFAULT_MAX_GAP);
        m.arm();
        assert_eq!(m.handle(CaptureEvent::Watchdog), CaptureState::Armed);
        m.handle(edge(0));
        assert_eq!(m.handle(CaptureEvent::Watchdog), CaptureState::Done);
    }

    /// Feeds a scripted event sequence from its own thread, like a real
    /// backend's delivery path.
    struct ScriptedSource {
        events: Vec<CaptureEvent>,
        handle: Option<JoinHandle<()>>,
    }

    impl ScriptedSource {
        fn new(events: Vec<CaptureEvent>) -> Self {
            ScriptedSource { events, handle: None }
        }
    }

    impl CaptureSource for ScriptedSource {
        fn start(&mut self, _pin: u8, _watchdog_ms: u16) -> Result<Receiver<CaptureEvent>, Error> {
            let (tx, rx) = mpsc::channel();
            let events = self.events.clone();
            self.handle = Some(thread::spawn(move || {
                for event in events {
                    if tx.send(event).is_err() {
                        return;
                    }
                    thread::sleep(Duration::from_millis(1));
                }
                // Keep the channel open a while so disconnection does not
                // race the foreground loop.
                thread::sleep(Duration::from_millis(50));
            }));
            Ok(rx)
        }

        fn stop(&mut self) {
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
            }
        }
    }

    fn quick_config() -> CaptureConfig {
        CaptureConfig {
            timeout: Duration::from_millis(500),
            poll_interval: Duration::from_millis(10),
            ..CaptureConfig::default()
        }
    }

    #[test]
    fn record_success() {
        // 13 edges produce 12 samples, then the watchdog closes the signal.
        let mut events: Vec<CaptureEvent> = (0..13).map(|n| edge(n * 600)).collect();
        events.push(CaptureEvent::Watchdog);

        let mut source = ScriptedSource::new(events);
        let code = record(&mut source, 4, &quick_config()).unwrap();
        assert_eq!(code, vec![600; 12]);
    }

    #[test]
    fn record_short_signal() {
        let mut events: Vec<CaptureEvent> = (0..4).map(|n| edge(n * 600)).collect();
        events.push(CaptureEvent::Watchdog);

        let mut source = ScriptedSource::new(events);
        match record(&mut source, 4, &quick_config()) {
            Err(Error::ShortSignal(3)) => {}
            other => panic!("expected ShortSignal(3), got {:?}", other),
        }
    }

    #[test]
    fn record_no_data_on_timeout() {
        let mut source = ScriptedSource::new(Vec::new());
        let config = CaptureConfig {
            timeout: Duration::from_millis(100),
            poll_interval: Duration::from_millis(10),
            ..CaptureConfig::default()
        };
        match record(&mut source, 4, &config) {
            Err(Error::NoData) => {}
            other => panic!("expected NoData, got {:?}", other),
        }
    }

    #[test]
    fn record_gap_terminated_signal_discards_tail() {
        let mut events = vec![edge(0), edge(600), edge(1200)];
        // Gap beyond max_gap ends the capture; the burst after it is lost.
        events.extend((0..20).map(|n| edge(60_000 + n * 600)));
        events.push(CaptureEvent::Watchdog);

        let mut source = ScriptedSource::new(events);
        match record(&mut source, 4, &quick_config()) {
            Err(Error::ShortSignal(2)) => {}
            other => panic!("expected ShortSignal(2), got {:?}", other),
        }
    }
}
