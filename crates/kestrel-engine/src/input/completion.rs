//! Producer side of the input queue.
//!
//! Every sent event is paired with a [`Completion`]. The manager consumes the
//! completion when it dispatches the event, so each ticket resolves at most
//! once; a completion dropped unresolved shows up as
//! [`CompletionError::Abandoned`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

use super::event::PlatformEvent;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("input event was dropped before it was handled")]
    Abandoned,
}

/// Single-shot "was it handled" signal for one queued event.
#[derive(Debug)]
pub(crate) struct Completion {
    sender: SyncSender<bool>,
}

impl Completion {
    fn pair() -> (Self, EventTicket) {
        let (sender, receiver) = mpsc::sync_channel(1);
        (
            Self { sender },
            EventTicket {
                receiver,
                outcome: None,
            },
        )
    }

    pub(crate) fn resolve(self, handled: bool) {
        // A dropped ticket means nobody is waiting.
        let _ = self.sender.send(handled);
    }
}

#[derive(Debug, Default)]
pub(crate) struct QueueState {
    pub events: VecDeque<(PlatformEvent, Completion)>,
    pub closed: bool,
}

pub(crate) type SharedQueue = Arc<Mutex<QueueState>>;

/// Cloneable handle platform threads use to queue events for the main thread.
#[derive(Debug, Clone)]
pub struct EventSender {
    queue: SharedQueue,
}

impl EventSender {
    pub(crate) fn new(queue: SharedQueue) -> Self {
        Self { queue }
    }

    /// Queues `event` and returns a ticket for its outcome.
    ///
    /// After the manager is gone the ticket resolves to
    /// [`CompletionError::Abandoned`] straight away.
    pub fn send(&self, event: PlatformEvent) -> EventTicket {
        let (completion, ticket) = Completion::pair();

        let mut queue = self.queue.lock();
        if queue.closed {
            log::debug!("input: {} dropped, manager is gone", event.kind.name());
        } else {
            queue.events.push_back((event, completion));
        }
        ticket
    }

    /// True once the manager has been dropped.
    pub fn is_closed(&self) -> bool {
        self.queue.lock().closed
    }
}

/// Outcome of one sent event.
#[derive(Debug)]
pub struct EventTicket {
    receiver: Receiver<bool>,
    outcome: Option<bool>,
}

impl EventTicket {
    /// Blocks until the event was dispatched.
    pub fn wait(self) -> Result<bool, CompletionError> {
        if let Some(handled) = self.outcome {
            return Ok(handled);
        }
        self.receiver.recv().map_err(|_| CompletionError::Abandoned)
    }

    /// `Ok(None)` when the event is still queued after `timeout`.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<bool>, CompletionError> {
        if self.outcome.is_some() {
            return Ok(self.outcome);
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(handled) => {
                self.outcome = Some(handled);
                Ok(Some(handled))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(CompletionError::Abandoned),
        }
    }

    /// Non-blocking poll; `Ok(None)` while the event is still queued.
    pub fn try_result(&mut self) -> Result<Option<bool>, CompletionError> {
        if self.outcome.is_some() {
            return Ok(self.outcome);
        }
        match self.receiver.try_recv() {
            Ok(handled) => {
                self.outcome = Some(handled);
                Ok(Some(handled))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(CompletionError::Abandoned),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{DeviceId, PlatformEventKind};

    fn event() -> PlatformEvent {
        PlatformEvent::new(DeviceId(1), PlatformEventKind::DeviceDiscoveryComplete)
    }

    fn sender() -> (EventSender, SharedQueue) {
        let queue = SharedQueue::default();
        (EventSender::new(queue.clone()), queue)
    }

    // ── tickets ───────────────────────────────────────────────────────────

    #[test]
    fn resolved_ticket_reports_handled_flag() {
        let (tx, queue) = sender();
        let mut ticket = tx.send(event());
        assert_eq!(ticket.try_result(), Ok(None));

        let (_, completion) = queue.lock().events.pop_front().unwrap();
        completion.resolve(true);

        assert_eq!(ticket.try_result(), Ok(Some(true)));
        // Cached after the first read.
        assert_eq!(ticket.try_result(), Ok(Some(true)));
        assert_eq!(ticket.wait(), Ok(true));
    }

    #[test]
    fn dropped_completion_abandons_ticket() {
        let (tx, queue) = sender();
        let ticket = tx.send(event());
        queue.lock().events.clear();
        assert_eq!(ticket.wait(), Err(CompletionError::Abandoned));
    }

    #[test]
    fn wait_timeout_on_pending_event() {
        let (tx, _queue) = sender();
        let mut ticket = tx.send(event());
        assert_eq!(ticket.wait_timeout(Duration::from_millis(5)), Ok(None));
    }

    #[test]
    fn resolving_without_a_waiter_is_harmless() {
        let (tx, queue) = sender();
        drop(tx.send(event()));
        let (_, completion) = queue.lock().events.pop_front().unwrap();
        completion.resolve(false);
    }

    // ── closed queue ──────────────────────────────────────────────────────

    #[test]
    fn send_after_close_abandons_immediately() {
        let (tx, queue) = sender();
        queue.lock().closed = true;

        assert!(tx.is_closed());
        let mut ticket = tx.send(event());
        assert_eq!(ticket.try_result(), Err(CompletionError::Abandoned));
        assert!(queue.lock().events.is_empty());
    }
}
