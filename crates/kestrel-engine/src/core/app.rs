use crate::input::{InputEvent, InputListener};

use super::ctx::{FrameCtx, StartCtx};

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by higher layers.
pub trait App {
    /// Called once the window and render device exist, before the first frame.
    fn on_start(&mut self, ctx: &mut StartCtx<'_>) {
        let _ = ctx;
    }

    /// Called for every input event during `InputManager::update`.
    /// The return value resolves the event's ticket.
    fn on_input(&mut self, event: &InputEvent) -> bool {
        let _ = event;
        false
    }

    /// Called once per redraw.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl;

    /// Called before the render device is torn down.
    fn on_exit(&mut self) {}
}

/// Routes manager events into [`App::on_input`].
pub(crate) struct AppListener<'a, A: ?Sized>(pub &'a mut A);

impl<A: App + ?Sized> InputListener for AppListener<'_, A> {
    fn on_input(&mut self, event: &InputEvent) -> bool {
        self.0.on_input(event)
    }
}
