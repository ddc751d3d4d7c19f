use std::fmt;

/// Integer extent in physical pixels (window, surface, display mode, texture).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Size2 {
    pub width: u32,
    pub height: u32,
}

impl Size2 {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A zero-area extent; backends defer surface configuration while empty.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn aspect(self) -> f32 {
        if self.height == 0 {
            0.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    #[inline]
    pub fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Size2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<winit::dpi::PhysicalSize<u32>> for Size2 {
    fn from(s: winit::dpi::PhysicalSize<u32>) -> Self {
        Size2::new(s.width, s.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_when_any_axis_is_zero() {
        assert!(Size2::new(0, 10).is_empty());
        assert!(Size2::new(10, 0).is_empty());
        assert!(!Size2::new(1, 1).is_empty());
    }

    #[test]
    fn aspect_of_zero_height_is_zero() {
        assert_eq!(Size2::new(640, 0).aspect(), 0.0);
        assert_eq!(Size2::new(1920, 1080).aspect(), 1920.0 / 1080.0);
    }

    #[test]
    fn display_uses_x_separator() {
        assert_eq!(Size2::new(800, 600).to_string(), "800x600");
    }

    #[test]
    fn ordering_is_width_major() {
        let mut modes = vec![Size2::new(1280, 720), Size2::new(640, 480), Size2::new(1280, 1024)];
        modes.sort();
        assert_eq!(modes, vec![Size2::new(640, 480), Size2::new(1280, 720), Size2::new(1280, 1024)]);
    }
}
