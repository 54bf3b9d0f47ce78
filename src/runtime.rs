use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent};

use crate::remote::CallOutcome;

/// Unified event type consumed by the app runner
#[derive(Debug)]
pub enum EngineEvent {
    Key(KeyEvent),
    Resize,
    Tick,
    FocusLost,
    FocusGained,
    /// A remote call finished on the worker thread
    Remote(CallOutcome),
}

/// Source of engine events (keyboard, resize, focus, remote responses)
pub trait EngineEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<EngineEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    tx: Sender<EngineEvent>,
    rx: Receiver<EngineEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let input_tx = tx.clone();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                Ok(CtEvent::Key(key)) => Some(EngineEvent::Key(key)),
                Ok(CtEvent::Resize(_, _)) => Some(EngineEvent::Resize),
                Ok(CtEvent::FocusLost) => Some(EngineEvent::FocusLost),
                Ok(CtEvent::FocusGained) => Some(EngineEvent::FocusGained),
                Ok(_) => None,
                Err(_) => break,
            };
            if let Some(ev) = forwarded {
                if input_tx.send(ev).is_err() {
                    break;
                }
            }
        });

        Self { tx, rx }
    }

    /// Handle for other threads (the remote worker) to inject events
    pub fn sender(&self) -> Sender<EngineEvent> {
        self.tx.clone()
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<EngineEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<EngineEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<EngineEvent>) -> Self {
        Self { rx }
    }
}

impl EngineEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<EngineEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: EngineEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: EngineEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> EngineEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                EngineEvent::Tick
            }
        }
    }
}
