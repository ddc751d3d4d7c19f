use crate::coords::{Color, Rect};

use super::cmd::{Command, DrawCall};

/// Ordered, owned sequence of commands submitted to the render thread as one unit.
///
/// Built on the producer thread, moved into the device by `submit`, consumed
/// once by the render thread and dropped.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
        }
    }

    /// Appends a command to the tail.
    #[inline]
    pub fn push(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Commands in execution order.
    #[inline]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// True when the buffer ends a frame.
    pub fn presents(&self) -> bool {
        self.commands.iter().any(|c| matches!(c, Command::Present))
    }

    pub fn clear(&mut self, color: Color) -> &mut Self {
        self.push(Command::Clear {
            color: Some(color),
            depth: Some(1.0),
        })
    }

    pub fn viewport(&mut self, rect: Rect) -> &mut Self {
        self.push(Command::SetViewport(rect))
    }

    pub fn draw(&mut self, call: DrawCall) -> &mut Self {
        self.push(Command::Draw(call))
    }

    pub fn present(&mut self) -> &mut Self {
        self.push(Command::Present)
    }
}

impl IntoIterator for CommandBuffer {
    type Item = Command;
    type IntoIter = std::vec::IntoIter<Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.into_iter()
    }
}

impl Extend<Command> for CommandBuffer {
    fn extend<T: IntoIterator<Item = Command>>(&mut self, iter: T) {
        self.commands.extend(iter);
    }
}

impl FromIterator<Command> for CommandBuffer {
    fn from_iter<T: IntoIterator<Item = Command>>(iter: T) -> Self {
        Self {
            commands: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{BlendMode, BufferId, ShaderId};

    fn draw(first: u32) -> Command {
        Command::Draw(DrawCall::new(ShaderId(1), BufferId(2), 3).range(first, 3))
    }

    #[test]
    fn push_appends_to_tail() {
        let mut cb = CommandBuffer::new();
        cb.push(draw(0)).push(draw(1)).present();

        let names: Vec<&str> = cb.commands().iter().map(Command::name).collect();
        assert_eq!(names, vec!["Draw", "Draw", "Present"]);
        assert_eq!(cb.commands()[1], draw(1));
    }

    #[test]
    fn into_iter_is_fifo() {
        let cb: CommandBuffer = (0..5).map(draw).collect();
        let firsts: Vec<u32> = cb
            .into_iter()
            .map(|c| match c {
                Command::Draw(call) => call.first,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(firsts, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn presents_detects_terminal_present() {
        let mut cb = CommandBuffer::new();
        cb.push(Command::SetBlendMode(BlendMode::Alpha));
        assert!(!cb.presents());
        cb.present();
        assert!(cb.presents());
    }

    #[test]
    fn empty_buffer() {
        let cb = CommandBuffer::with_capacity(8);
        assert!(cb.is_empty());
        assert_eq!(cb.len(), 0);
    }
}
