use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{Receiver, SyncSender};
use std::sync::Arc;

use crate::command::{Command, CommandBuffer};

use super::backend::{release_handles, Acquired, GraphicsBackend};
use super::error::{BackendError, RenderError};
use super::render_device::{DeviceShared, RenderState};

/// Unit of work crossing the submission channel.
#[derive(Debug)]
pub(crate) enum Submission {
    Commands(CommandBuffer),
    /// Wakes a blocked receive and ends the loop once everything queued before it has run.
    Stop,
}

/// Outcome of one [`RenderWorker::process`] call that did not fail.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Processed {
    Buffer,
    Stopped,
}

/// Render-thread side of a device: owns the backend after handoff.
pub(crate) struct RenderWorker<B: GraphicsBackend> {
    backend: B,
    receiver: Receiver<Submission>,
    shared: Arc<DeviceShared>,
    buffers: u64,
}

impl<B: GraphicsBackend> RenderWorker<B> {
    pub(crate) fn new(backend: B, receiver: Receiver<Submission>, shared: Arc<DeviceShared>) -> Self {
        Self {
            backend,
            receiver,
            shared,
            buffers: 0,
        }
    }

    /// Blocks for the next submission and executes it.
    ///
    /// A closed channel counts as a stop request.
    pub(crate) fn process(&mut self) -> Result<Processed, RenderError> {
        match self.receiver.recv() {
            Ok(Submission::Commands(buffer)) => {
                self.execute_buffer(buffer)?;
                Ok(Processed::Buffer)
            }
            Ok(Submission::Stop) | Err(_) => Ok(Processed::Stopped),
        }
    }

    /// Runs `process` until stopped. Per-buffer errors are logged and the loop continues.
    pub(crate) fn run(&mut self) {
        loop {
            match self.process() {
                Ok(Processed::Buffer) => {}
                Ok(Processed::Stopped) => break,
                Err(e) => log::error!("{}: {e}", self.backend.name()),
            }
        }
        log::debug!("{}: render loop finished after {} buffer(s)", self.backend.name(), self.buffers);
    }

    /// Executes every command of `buffer` in order.
    ///
    /// A failing or panicking command does not stop the buffer. The first
    /// failure is returned, later ones are logged.
    pub(crate) fn execute_buffer(&mut self, buffer: CommandBuffer) -> Result<(), RenderError> {
        self.buffers += 1;
        let mut first_error = self.apply_pending_resize().err();

        for (index, command) in buffer.into_iter().enumerate() {
            let name = command.name();
            log::trace!("buffer {} command #{index}: {name}", self.buffers);

            let backend = &mut self.backend;
            let result = match command {
                Command::Present => contain(|| backend.present())
                    .map_err(|source| RenderError::Present { index, source }),
                other => contain(|| backend.execute(other)).map_err(|source| RenderError::Command {
                    index,
                    command: name,
                    source,
                }),
            };

            if let Err(e) = result {
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    log::error!("{}: {e}", self.backend.name());
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn apply_pending_resize(&mut self) -> Result<(), RenderError> {
        let Some(size) = self.shared.take_resize() else {
            return Ok(());
        };

        log::debug!("{}: resizing to {size}", self.backend.name());
        let backend = &mut self.backend;
        contain(|| backend.resize(size)).map_err(|source| RenderError::Resize { size, source })
    }

    pub(crate) fn into_backend(self) -> B {
        self.backend
    }
}

/// Runs one backend call, turning a panic into [`BackendError::Panicked`].
///
/// The backend stays in use afterwards; a command that panicked is treated like
/// one that failed.
fn contain<E>(call: impl FnOnce() -> Result<(), E>) -> Result<(), E>
where
    E: From<BackendError>,
{
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => Err(E::from(BackendError::Panicked(panic_message(&*payload)))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Clears the running flag when the render thread leaves, however it leaves.
struct ExitGuard(Arc<DeviceShared>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.0.set_running(false);
        if self.0.state() == RenderState::Running {
            self.0.set_state(RenderState::Stopping);
        }
    }
}

/// Body of the `render` thread.
///
/// Binds the context, reports the result through `ready`, runs the loop,
/// then unbinds and releases every acquired handle.
pub(crate) fn render_thread<B: GraphicsBackend>(
    mut backend: B,
    acquired: Acquired,
    receiver: Receiver<Submission>,
    shared: Arc<DeviceShared>,
    ready: SyncSender<Result<(), BackendError>>,
) {
    if let Err(e) = backend.make_current() {
        log::error!("{}: failed to bind context on render thread: {e}", backend.name());
        release_handles(&mut backend, acquired);
        let _ = ready.send(Err(e));
        return;
    }

    let _exit = ExitGuard(shared.clone());
    shared.set_running(true);
    shared.set_state(RenderState::Running);
    let _ = ready.send(Ok(()));
    drop(ready);

    let mut worker = RenderWorker::new(backend, receiver, shared);
    worker.run();

    let mut backend = worker.into_backend();
    if let Err(e) = backend.release_current() {
        log::error!("{}: failed to unbind context: {e}", backend.name());
    }
    release_handles(&mut backend, acquired);
}
