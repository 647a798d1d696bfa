use serde::{Deserialize, Serialize};

/// Axis-aligned integer rectangle, in either view space or buffer space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    /// Corners in the order top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [(f32, f32); 4] {
        [
            (self.left as f32, self.top as f32),
            (self.right as f32, self.top as f32),
            (self.right as f32, self.bottom as f32),
            (self.left as f32, self.bottom as f32),
        ]
    }

    /// Intersect with `[0, width] x [0, height]`.
    pub fn clamp_to(&self, size: Size) -> Rect {
        let w = size.width as i32;
        let h = size.height as i32;
        Rect {
            left: self.left.clamp(0, w),
            top: self.top.clamp(0, h),
            right: self.right.clamp(0, w),
            bottom: self.bottom.clamp(0, h),
        }
    }
}

/// Pixel dimensions of a view or a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Running bounding box over a set of float points.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn empty() -> Self {
        Self {
            min_x: f32::INFINITY,
            min_y: f32::INFINITY,
            max_x: f32::NEG_INFINITY,
            max_y: f32::NEG_INFINITY,
        }
    }

    pub fn include(&mut self, x: f32, y: f32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn clamp(self, width: f32, height: f32) -> Self {
        Self {
            min_x: self.min_x.clamp(0.0, width),
            min_y: self.min_y.clamp(0.0, height),
            max_x: self.max_x.clamp(0.0, width),
            max_y: self.max_y.clamp(0.0, height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_dimensions() {
        let r = Rect::new(10, 20, 110, 70);
        assert_eq!(r.width(), 100);
        assert_eq!(r.height(), 50);
        assert!(!r.is_empty());
        assert!(Rect::new(5, 5, 5, 10).is_empty());
    }

    #[test]
    fn test_rect_clamp_to_size() {
        let r = Rect::new(-10, -5, 700, 500).clamp_to(Size::new(640, 480));
        assert_eq!(r, Rect::new(0, 0, 640, 480));
    }

    #[test]
    fn test_bounds_tracks_extremes() {
        let mut b = Bounds::empty();
        b.include(3.0, 9.0);
        b.include(-1.0, 4.0);
        b.include(7.5, 2.0);
        let b = b.clamp(5.0, 8.0);
        assert_eq!((b.min_x, b.min_y, b.max_x, b.max_y), (0.0, 2.0, 5.0, 8.0));
    }
}
