use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent};

/// Unified event type consumed by the app loop.
#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of app events (keyboard, resize, countdown ticks).
pub trait EventSource {
    /// Block for the next event. None means the source is exhausted and
    /// the loop should exit.
    fn next(&self) -> Option<AppEvent>;
}

/// Production event source: one thread reading crossterm events, one
/// thread emitting a Tick every interval, both feeding one channel so
/// event handling is serialized. The dedicated ticker thread means a
/// steady stream of keystrokes can never starve the countdown.
pub struct CrosstermEventSource {
    rx: Receiver<AppEvent>,
}

impl CrosstermEventSource {
    pub fn new(tick_interval: Duration) -> Self {
        let (tx, rx) = mpsc::channel();

        let tick_tx = tx.clone();
        thread::spawn(move || loop {
            thread::sleep(tick_interval);
            if tick_tx.send(AppEvent::Tick).is_err() {
                break;
            }
        });

        thread::spawn(move || loop {
            match event::read() {
                Ok(CtEvent::Key(key)) => {
                    if tx.send(AppEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if tx.send(AppEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        });

        Self { rx }
    }
}

impl EventSource for CrosstermEventSource {
    fn next(&self) -> Option<AppEvent> {
        self.rx.recv().ok()
    }
}

/// Test event source fed by hand from a channel.
pub struct TestEventSource {
    rx: Receiver<AppEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for TestEventSource {
    fn next(&self) -> Option<AppEvent> {
        self.rx.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_passes_events_through_in_order() {
        let (tx, rx) = mpsc::channel();
        tx.send(AppEvent::Resize).unwrap();
        tx.send(AppEvent::Tick).unwrap();
        let source = TestEventSource::new(rx);

        assert!(matches!(source.next(), Some(AppEvent::Resize)));
        assert!(matches!(source.next(), Some(AppEvent::Tick)));
    }

    #[test]
    fn test_source_ends_when_sender_drops() {
        let (tx, rx) = mpsc::channel::<AppEvent>();
        drop(tx);
        let source = TestEventSource::new(rx);
        assert!(source.next().is_none());
    }
}
