use std::sync::Arc;

use parking_lot::Mutex;

use crate::command::Command;
use crate::coords::Size2;
use crate::device::ApiVersion;

/// Platform handle kinds tracked by the null backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Handle {
    Display,
    Surface,
    Context,
}

/// One observable backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum JournalEntry {
    Acquired(Handle),
    Released(Handle),
    ContextAttempt(ApiVersion),
    VerticalSync(bool),
    /// Context bound to the named thread.
    Bound(Option<String>),
    Unbound(Option<String>),
    Resized(Size2),
    Executed(Command),
    Rejected(Command),
    Presented,
}

/// Shared, append-only record of what a `NullBackend` did.
///
/// Clones observe the same record, so a test keeps one while the backend
/// moves to the render thread.
#[derive(Debug, Clone, Default)]
pub struct NullJournal {
    entries: Arc<Mutex<Vec<JournalEntry>>>,
}

impl NullJournal {
    pub(crate) fn record(&self, entry: JournalEntry) {
        self.entries.lock().push(entry);
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries.lock().clone()
    }

    /// Successfully executed commands, in execution order.
    pub fn commands(&self) -> Vec<Command> {
        self.entries
            .lock()
            .iter()
            .filter_map(|e| match e {
                JournalEntry::Executed(c) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn released(&self) -> Vec<Handle> {
        self.entries
            .lock()
            .iter()
            .filter_map(|e| match e {
                JournalEntry::Released(h) => Some(*h),
                _ => None,
            })
            .collect()
    }

    pub fn presents(&self) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|e| matches!(e, JournalEntry::Presented))
            .count()
    }

    /// Thread names the context was bound to, in order.
    pub fn bound_threads(&self) -> Vec<Option<String>> {
        self.entries
            .lock()
            .iter()
            .filter_map(|e| match e {
                JournalEntry::Bound(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }
}
