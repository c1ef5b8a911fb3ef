use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::engine::Keystroke;

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum KataEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait KataEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<KataEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<KataEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let sent = match event::read() {
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    tx.send(KataEvent::Key(key))
                }
                Ok(CtEvent::Resize(_, _)) => tx.send(KataEvent::Resize),
                Ok(_) => Ok(()),
                Err(err) => {
                    tracing::error!(error = %err, "terminal event reader stopped");
                    break;
                }
            };
            if sent.is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl KataEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<KataEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<KataEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<KataEvent>) -> Self {
        Self { rx }
    }
}

impl KataEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<KataEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: KataEventSource> {
    event_source: E,
    tick: Duration,
}

impl<E: KataEventSource> Runner<E> {
    pub fn new(event_source: E, tick: Duration) -> Self {
        Self { event_source, tick }
    }

    /// Blocks up to the tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> KataEvent {
        match self.event_source.recv_timeout(self.tick) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => KataEvent::Tick,
        }
    }
}

/// Translate a terminal key event into an engine keystroke.
///
/// Ctrl+Backspace arrives as Ctrl+H or Ctrl+W on most terminals, and as
/// Alt+Backspace on others; all of them delete a word.
pub fn keystroke_for(key: &KeyEvent) -> Keystroke {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    match key.code {
        KeyCode::Backspace if ctrl || alt => Keystroke::DeleteWord,
        KeyCode::Backspace => Keystroke::Backspace,
        KeyCode::Char('h') | KeyCode::Char('w') if ctrl => Keystroke::DeleteWord,
        KeyCode::Char(_) if ctrl || alt => Keystroke::Ignored,
        KeyCode::Char(c) => Keystroke::Char(c),
        KeyCode::Enter => Keystroke::Enter,
        KeyCode::Tab => Keystroke::Tab,
        _ => Keystroke::Ignored,
    }
}
