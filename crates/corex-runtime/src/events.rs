use corex_types::{Event, EventPayload, SessionId};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Converts internal orchestrator occurrences into wire `Event`s and pushes
/// them onto a single per-run ordered channel. Also owns the ping keepalive:
/// any call to `emit` resets the idle clock, and `maybe_ping` is polled by
/// the orchestrator's driver loop between suspension points.
pub struct EventEmitter {
    session_id: SessionId,
    iteration: u64,
    last_emitted: Instant,
    ping_interval: Duration,
    sink: mpsc::Sender<Event>,
}

impl EventEmitter {
    pub fn new(session_id: SessionId, ping_interval: Duration) -> (Self, mpsc::Receiver<Event>) {
        let (sink, rx) = mpsc::channel(64);
        let emitter = Self { session_id, iteration: 0, last_emitted: Instant::now(), ping_interval, sink };
        (emitter, rx)
    }

    pub fn set_iteration(&mut self, iteration: u64) {
        self.iteration = iteration;
    }

    /// A clone of the underlying sink, for collaborators (e.g. the
    /// confirmation gate) that need to push events from outside the
    /// driver loop's own `emit` calls.
    pub fn sender(&self) -> mpsc::Sender<Event> {
        self.sink.clone()
    }

    /// Build and send an event. Errors only if the receiving half of the
    /// stream has already been dropped, which the orchestrator treats as
    /// "the client went away" and folds into cancellation.
    pub async fn emit(&mut self, payload: EventPayload) -> Result<(), mpsc::error::SendError<Event>> {
        let event = Event::new(self.session_id.clone(), self.iteration, payload);
        self.last_emitted = Instant::now();
        self.sink.send(event).await
    }

    /// Send a `ping` if the idle gap since the last emitted event has
    /// reached `ping_interval`. Returns whether a ping was sent.
    pub async fn maybe_ping(&mut self) -> bool {
        if self.last_emitted.elapsed() >= self.ping_interval {
            let _ = self.emit(EventPayload::Ping).await;
            true
        } else {
            false
        }
    }
}
