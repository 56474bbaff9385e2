//! Foreground application tracking, consumed by the engine.
//!
//! The recorder does not know how to observe the foreground app; platform
//! glue does. The engine registers with a [`ForegroundTracker`] at startup
//! and hands it a [`ForegroundEvents`] facade. Notifier threads only ever
//! perform a channel send through that facade, so engine state is never
//! touched from an external thread.

use std::sync::mpsc;

use crate::engine::EngineCommand;

/// Cloneable facade through which trackers report foreground changes.
///
/// Changes are delivered to the engine in send order; notifications after
/// the engine has stopped are silently dropped.
#[derive(Clone)]
pub struct ForegroundEvents {
    commands: mpsc::Sender<EngineCommand>,
}

impl ForegroundEvents {
    pub(crate) fn new(commands: mpsc::Sender<EngineCommand>) -> Self {
        ForegroundEvents { commands }
    }

    /// Report that `package` just came to the foreground.
    pub fn foreground_changed(&self, package: impl Into<String>) {
        let _ = self
            .commands
            .send(EngineCommand::ForegroundChanged(package.into()));
    }
}

/// Platform integration that knows which application is in the foreground.
///
/// The engine calls `register` once at startup and `unregister` once during
/// orderly stop; implementations deliver every change they observe through
/// the events facade, in their own delivery order.
pub trait ForegroundTracker: Send {
    fn register(&mut self, events: ForegroundEvents);
    fn unregister(&mut self);
}

/// Tracker for headless deployments: never reports anything, so every
/// record carries no foreground attribution.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullForegroundTracker;

impl ForegroundTracker for NullForegroundTracker {
    fn register(&mut self, _events: ForegroundEvents) {}
    fn unregister(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_facade_sends_foreground_command() {
        let (tx, rx) = mpsc::channel();
        let events = ForegroundEvents::new(tx);

        events.foreground_changed("com.example.maps");

        match rx.recv().unwrap() {
            EngineCommand::ForegroundChanged(package) => {
                assert_eq!(package, "com.example.maps");
            }
            _ => panic!("unexpected command"),
        }
    }

    #[test]
    fn events_facade_survives_disconnected_engine() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let events = ForegroundEvents::new(tx);

        // Must not panic; late notifications are dropped.
        events.foreground_changed("com.example.maps");
    }

    #[test]
    fn null_tracker_accepts_lifecycle_calls() {
        let (tx, _rx) = mpsc::channel();
        let mut tracker = NullForegroundTracker;
        tracker.register(ForegroundEvents::new(tx));
        tracker.unregister();
    }
}
