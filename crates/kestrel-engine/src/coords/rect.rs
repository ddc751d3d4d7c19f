use super::{Size2, Vec2};

/// Axis-aligned rectangle in physical pixels, used for viewports and scissors.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Integer scissor bounds: `(x, y, width, height)`.
pub type ScissorBounds = (u32, u32, u32, u32);

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// The rectangle covering a whole target of the given extent.
    #[inline]
    pub fn from_size(size: Size2) -> Self {
        Self::new(0.0, 0.0, size.width as f32, size.height as f32)
    }

    #[inline]
    pub fn origin(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Flips negative extents so width and height are non-negative.
    pub fn normalized(self) -> Self {
        let (x, width) = if self.width < 0.0 {
            (self.x + self.width, -self.width)
        } else {
            (self.x, self.width)
        };
        let (y, height) = if self.height < 0.0 {
            (self.y + self.height, -self.height)
        } else {
            (self.y, self.height)
        };
        Rect::new(x, y, width, height)
    }

    /// Overlap of two rectangles; `None` when they only touch or are disjoint.
    pub fn intersect(self, other: Rect) -> Option<Rect> {
        let a = self.normalized();
        let b = other.normalized();

        let x0 = a.x.max(b.x);
        let y0 = a.y.max(b.y);
        let x1 = (a.x + a.width).min(b.x + b.width);
        let y1 = (a.y + a.height).min(b.y + b.height);

        if x1 - x0 <= 0.0 || y1 - y0 <= 0.0 {
            None
        } else {
            Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
        }
    }

    /// Converts to integer bounds inside a target of extent `target`.
    ///
    /// Returns `None` when nothing of the rectangle lies inside the target; a
    /// backend must skip the draw in that case rather than set an empty scissor.
    pub fn clamp_to(self, target: Size2) -> Option<ScissorBounds> {
        let clipped = self.intersect(Rect::from_size(target))?;

        let x0 = clipped.x.floor().max(0.0) as u32;
        let y0 = clipped.y.floor().max(0.0) as u32;
        let x1 = ((clipped.x + clipped.width).ceil() as u32).min(target.width);
        let y1 = ((clipped.y + clipped.height).ceil() as u32).min(target.height);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0, y0, x1 - x0, y1 - y0))
    }
}
