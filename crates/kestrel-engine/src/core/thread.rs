use std::io;
use std::sync::Arc;
use std::thread::{Builder, JoinHandle};

use parking_lot::Mutex;

/// Spawns a thread named `name` that takes ownership of `value`.
///
/// If the thread cannot be created, `value` is passed to `reclaim` before the
/// error is returned, so whatever it holds can still be released.
pub(crate) fn spawn_owning<T, F, R>(name: &str, value: T, body: F, reclaim: R) -> io::Result<JoinHandle<()>>
where
    T: Send + 'static,
    F: FnOnce(T) + Send + 'static,
    R: FnOnce(T),
{
    spawn_with(Builder::new().name(name.to_string()), value, body, reclaim)
}

fn spawn_with<T, F, R>(builder: Builder, value: T, body: F, reclaim: R) -> io::Result<JoinHandle<()>>
where
    T: Send + 'static,
    F: FnOnce(T) + Send + 'static,
    R: FnOnce(T),
{
    let slot = Arc::new(Mutex::new(Some(value)));
    let thread_slot = slot.clone();

    let spawned = builder.spawn(move || {
        let value = thread_slot.lock().take();
        if let Some(value) = value {
            body(value);
        }
    });

    spawned.inspect_err(|_| {
        let value = slot.lock().take();
        if let Some(value) = value {
            reclaim(value);
        }
    })
}
