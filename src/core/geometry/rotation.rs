//! View ⇄ unrotated buffer rectangle mapping.
//!
//! The preview is drawn cover-fit (uniform scale, centered, cropped) after the
//! sensor buffer has been turned a quarter to match the display. Mapping a
//! capture window back into the raw buffer therefore has to undo the centering
//! offset, the scale and the quarter turn, in that order.

use super::rect::{Bounds, Rect, Size};

/// Chroma subsampling needs crops of at least one full 2x2 block.
const MIN_EXTENT: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayRotation {
    Rotation0,
    Rotation90,
    Rotation180,
    Rotation270,
}

impl DisplayRotation {
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Self::Rotation0),
            90 => Some(Self::Rotation90),
            180 => Some(Self::Rotation180),
            270 => Some(Self::Rotation270),
            _ => None,
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            Self::Rotation0 => 0,
            Self::Rotation90 => 90,
            Self::Rotation180 => 180,
            Self::Rotation270 => 270,
        }
    }

    /// The quarter turn between buffer and view, for the landscape rotations.
    pub fn quarter_turn(self) -> Option<QuarterTurn> {
        match self {
            Self::Rotation90 => Some(QuarterTurn::Clockwise),
            Self::Rotation270 => Some(QuarterTurn::CounterClockwise),
            Self::Rotation0 | Self::Rotation180 => None,
        }
    }
}

/// The two perpendicular rotations for which exact mapping is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuarterTurn {
    /// Display `Rotation90`: `xu = W - yr, yu = xr`.
    Clockwise,
    /// Display `Rotation270`: `xu = yr, yu = H - xr`.
    CounterClockwise,
}

impl QuarterTurn {
    fn rotated_to_unrotated(self, fit: &CoverFit, xr: f32, yr: f32) -> (f32, f32) {
        match self {
            Self::Clockwise => (fit.buf_w - yr, xr),
            Self::CounterClockwise => (yr, fit.buf_h - xr),
        }
    }

    fn unrotated_to_rotated(self, fit: &CoverFit, xu: f32, yu: f32) -> (f32, f32) {
        match self {
            Self::Clockwise => (yu, fit.buf_w - xu),
            Self::CounterClockwise => (fit.buf_h - yu, xu),
        }
    }
}

/// Uniform cover-fit of the quarter-turned buffer onto the view.
#[derive(Debug, Clone, Copy)]
struct CoverFit {
    scale: f32,
    offset_x: f32,
    offset_y: f32,
    rot_w: f32,
    rot_h: f32,
    buf_w: f32,
    buf_h: f32,
}

impl CoverFit {
    fn new(view: Size, buffer: Size) -> Self {
        let view_w = view.width as f32;
        let view_h = view.height as f32;
        let buf_w = buffer.width as f32;
        let buf_h = buffer.height as f32;
        let rot_w = buf_h;
        let rot_h = buf_w;
        let scale = (view_w / rot_w).max(view_h / rot_h);

        Self {
            scale,
            offset_x: (view_w - scale * rot_w) / 2.0,
            offset_y: (view_h - scale * rot_h) / 2.0,
            rot_w,
            rot_h,
            buf_w,
            buf_h,
        }
    }

    fn view_to_rotated(&self, xv: f32, yv: f32) -> (f32, f32) {
        (
            (xv - self.offset_x) / self.scale,
            (yv - self.offset_y) / self.scale,
        )
    }

    fn rotated_to_view(&self, xr: f32, yr: f32) -> (f32, f32) {
        (
            xr * self.scale + self.offset_x,
            yr * self.scale + self.offset_y,
        )
    }
}

/// Stateless mapper bound to one view size and one buffer size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationMapper {
    view: Size,
    buffer: Size,
}

impl RotationMapper {
    pub fn new(view: Size, buffer: Size) -> Self {
        Self { view, buffer }
    }

    pub fn view(&self) -> Size {
        self.view
    }

    pub fn buffer(&self) -> Size {
        self.buffer
    }

    /// Point view → unrotated buffer, without clamping.
    pub fn view_point_to_buffer(&self, turn: QuarterTurn, xv: f32, yv: f32) -> (f32, f32) {
        let fit = CoverFit::new(self.view, self.buffer);
        let (xr, yr) = fit.view_to_rotated(xv, yv);
        turn.rotated_to_unrotated(&fit, xr, yr)
    }

    /// Point unrotated buffer → view, without clamping.
    pub fn buffer_point_to_view(&self, turn: QuarterTurn, xu: f32, yu: f32) -> (f32, f32) {
        let fit = CoverFit::new(self.view, self.buffer);
        let (xr, yr) = turn.unrotated_to_rotated(&fit, xu, yu);
        fit.rotated_to_view(xr, yr)
    }

    /// Maps a view rectangle into the unrotated buffer.
    ///
    /// The result is clamped into the buffer, has even origin and extent, and
    /// is at least 2x2.
    pub fn view_rect_to_buffer(&self, rect: Rect, turn: QuarterTurn) -> Rect {
        let fit = CoverFit::new(self.view, self.buffer);

        let mut bounds = Bounds::empty();
        for (xv, yv) in rect.corners() {
            let (xr, yr) = fit.view_to_rotated(xv, yv);
            let xr = xr.clamp(0.0, fit.rot_w);
            let yr = yr.clamp(0.0, fit.rot_h);
            let (xu, yu) = turn.rotated_to_unrotated(&fit, xr, yr);
            bounds.include(xu, yu);
        }

        self.align_even(bounds.clamp(fit.buf_w, fit.buf_h))
    }

    /// Inverse of [`view_rect_to_buffer`](Self::view_rect_to_buffer), for the
    /// on-screen debug rectangle only.
    pub fn buffer_rect_to_view(&self, rect: Rect, turn: QuarterTurn) -> Rect {
        let fit = CoverFit::new(self.view, self.buffer);

        let mut bounds = Bounds::empty();
        for (xu, yu) in rect.corners() {
            let (xr, yr) = turn.unrotated_to_rotated(&fit, xu, yu);
            let (xv, yv) = fit.rotated_to_view(xr, yr);
            bounds.include(xv, yv);
        }

        let b = bounds.clamp(self.view.width as f32, self.view.height as f32);
        Rect::new(
            b.min_x.round() as i32,
            b.min_y.round() as i32,
            b.max_x.round() as i32,
            b.max_y.round() as i32,
        )
    }

    /// Crop rectangle in buffer space for any display rotation.
    ///
    /// Upright and half-turn pass the capture window straight through; the
    /// half-turn remap is not needed for the rotations this scanner runs in.
    pub fn capture_rect_in_buffer(&self, rect: Rect, rotation: DisplayRotation) -> Rect {
        match rotation.quarter_turn() {
            Some(turn) => self.view_rect_to_buffer(rect, turn),
            None => {
                let mut bounds = Bounds::empty();
                for (x, y) in rect.corners() {
                    bounds.include(x, y);
                }
                self.align_even(
                    bounds.clamp(self.buffer.width as f32, self.buffer.height as f32),
                )
            }
        }
    }

    /// Forward-then-inverse round trip of the capture window, i.e. the region
    /// that is actually cropped, drawn back in view space.
    pub fn debug_rect(&self, rect: Rect, rotation: DisplayRotation) -> Option<Rect> {
        let turn = rotation.quarter_turn()?;
        let buffer_rect = self.view_rect_to_buffer(rect, turn);
        Some(self.buffer_rect_to_view(buffer_rect, turn))
    }

    fn align_even(&self, b: Bounds) -> Rect {
        let w_even = (self.buffer.width as i32) & !1;
        let h_even = (self.buffer.height as i32) & !1;

        let left = round_even(b.min_x).clamp(0, w_even);
        let top = round_even(b.min_y).clamp(0, h_even);
        let right = round_even(b.max_x).min(w_even);
        let bottom = round_even(b.max_y).min(h_even);

        let (left, right) = ensure_min_extent(left, right, w_even);
        let (top, bottom) = ensure_min_extent(top, bottom, h_even);
        Rect::new(left, top, right, bottom)
    }
}

/// Nearest integer, then down to the even pixel below it.
fn round_even(v: f32) -> i32 {
    (v.round() as i32) & !1
}

fn ensure_min_extent(near: i32, far: i32, bound: i32) -> (i32, i32) {
    if far > near {
        (near, far)
    } else if near + MIN_EXTENT <= bound {
        (near, near + MIN_EXTENT)
    } else {
        // pinned at the far bound: pull the near edge back
        ((bound - MIN_EXTENT).max(0), bound)
    }
}

/// Rotation hint for the recognition engine for an unrotated buffer
/// (rear camera).
pub fn recognition_rotation_degrees(sensor_orientation: i32, display: DisplayRotation) -> i32 {
    (sensor_orientation - display.degrees()).rem_euclid(360)
}

/// Whether buffer width/height are swapped relative to the display.
pub fn dimensions_swapped(sensor_orientation: i32, display: DisplayRotation) -> bool {
    let sensor_perpendicular = matches!(sensor_orientation.rem_euclid(360), 90 | 270);
    match display {
        DisplayRotation::Rotation0 | DisplayRotation::Rotation180 => sensor_perpendicular,
        DisplayRotation::Rotation90 | DisplayRotation::Rotation270 => !sensor_perpendicular,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn landscape_mapper() -> RotationMapper {
        // 横屏 2400x1080 视图，1920x1080 预览缓冲（传感器 90°）
        RotationMapper::new(Size::new(2400, 1080), Size::new(1920, 1080))
    }

    fn assert_buffer_rect_valid(r: Rect, buffer: Size) {
        assert!(r.left >= 0 && r.top >= 0, "{r:?}");
        assert!(r.left < r.right && r.right <= buffer.width as i32, "{r:?}");
        assert!(r.top < r.bottom && r.bottom <= buffer.height as i32, "{r:?}");
        assert_eq!(r.left % 2, 0, "{r:?}");
        assert_eq!(r.top % 2, 0, "{r:?}");
        assert_eq!(r.width() % 2, 0, "{r:?}");
        assert_eq!(r.height() % 2, 0, "{r:?}");
    }

    #[test]
    fn test_display_rotation_from_degrees() {
        assert_eq!(DisplayRotation::from_degrees(-90), Some(DisplayRotation::Rotation270));
        assert_eq!(DisplayRotation::from_degrees(450), Some(DisplayRotation::Rotation90));
        assert_eq!(DisplayRotation::from_degrees(45), None);
        assert!(DisplayRotation::Rotation90.quarter_turn().is_some());
        assert!(DisplayRotation::Rotation180.quarter_turn().is_none());
    }

    #[test]
    fn test_point_round_trip_is_exact() {
        let mapper = landscape_mapper();
        for turn in [QuarterTurn::Clockwise, QuarterTurn::CounterClockwise] {
            for (xv, yv) in [(0.0, 0.0), (1200.0, 540.0), (2399.0, 17.5), (333.3, 1000.0)] {
                let (xu, yu) = mapper.view_point_to_buffer(turn, xv, yv);
                let (xb, yb) = mapper.buffer_point_to_view(turn, xu, yu);
                assert!((xb - xv).abs() < 1e-2 && (yb - yv).abs() < 1e-2);
            }
        }
    }

    #[test]
    fn test_clockwise_maps_view_center_to_buffer_center() {
        let mapper = landscape_mapper();
        let (xu, yu) = mapper.view_point_to_buffer(QuarterTurn::Clockwise, 1200.0, 540.0);
        assert!((xu - 960.0).abs() < 1e-3);
        assert!((yu - 540.0).abs() < 1e-3);
    }

    #[test]
    fn test_clockwise_axis_swap() {
        // 1080x1920 视图恰好 1:1 覆盖旋转后的 1920x1080 缓冲，无缩放无偏移
        let mapper = RotationMapper::new(Size::new(1080, 1920), Size::new(1920, 1080));
        let r = mapper.view_rect_to_buffer(Rect::new(100, 200, 300, 400), QuarterTurn::Clockwise);
        // xu = W - yr, yu = xr
        assert_eq!(r, Rect::new(1920 - 400, 100, 1920 - 200, 300));

        let r = mapper.view_rect_to_buffer(
            Rect::new(100, 200, 300, 400),
            QuarterTurn::CounterClockwise,
        );
        // xu = yr, yu = H - xr
        assert_eq!(r, Rect::new(200, 1080 - 300, 400, 1080 - 100));
    }

    #[test]
    fn test_rect_outside_view_is_clamped() {
        let mapper = landscape_mapper();
        // offset_y ≈ -1593，纵向需要越过 [-1593, 2673] 才能盖住整个缓冲
        let r = mapper.view_rect_to_buffer(Rect::new(-500, -2000, 5000, 5000), QuarterTurn::Clockwise);
        assert_eq!(r, Rect::new(0, 0, 1920, 1080));

        // y = -500 → yr ≈ 492，顺时针时右边界 xu = 1920 - 492
        let r = mapper.view_rect_to_buffer(Rect::new(-500, -500, 5000, 5000), QuarterTurn::Clockwise);
        assert_eq!(r, Rect::new(0, 0, 1428, 1080));
    }

    #[test]
    fn test_degenerate_rect_gets_min_extent() {
        let mapper = landscape_mapper();
        let r = mapper.view_rect_to_buffer(Rect::new(600, 300, 600, 300), QuarterTurn::Clockwise);
        assert_buffer_rect_valid(r, mapper.buffer());
        assert_eq!((r.width(), r.height()), (2, 2));
    }

    #[test]
    fn test_degenerate_rect_at_far_edge_stays_inside() {
        let mapper = RotationMapper::new(Size::new(1080, 1920), Size::new(1920, 1080));
        // 视图左上角 → 顺时针时落在缓冲右边界
        let r = mapper.view_rect_to_buffer(Rect::new(0, 0, 0, 0), QuarterTurn::Clockwise);
        assert_buffer_rect_valid(r, mapper.buffer());
        assert_eq!(r.right, 1920);
    }

    #[test]
    fn test_odd_buffer_never_exceeds_bounds() {
        let mapper = RotationMapper::new(Size::new(801, 601), Size::new(799, 599));
        let r = mapper.view_rect_to_buffer(Rect::new(0, 0, 801, 601), QuarterTurn::CounterClockwise);
        assert_buffer_rect_valid(r, mapper.buffer());
    }

    #[test]
    fn test_debug_rect_round_trip() {
        let mapper = landscape_mapper();
        let capture = Rect::new(825, 315, 1575, 765);
        let back = mapper.debug_rect(capture, DisplayRotation::Rotation90).expect("横屏应有调试框");
        // 缩放约 2.22，缓冲侧偶数对齐最多带来约 4 个视图像素的偏差
        assert!((back.left - capture.left).abs() <= 5);
        assert!((back.top - capture.top).abs() <= 5);
        assert!((back.right - capture.right).abs() <= 5);
        assert!((back.bottom - capture.bottom).abs() <= 5);

        assert!(mapper.debug_rect(capture, DisplayRotation::Rotation0).is_none());
    }

    #[test]
    fn test_upright_passes_through() {
        let mapper = RotationMapper::new(Size::new(1080, 1920), Size::new(1080, 1920));
        let r = mapper.capture_rect_in_buffer(Rect::new(141, 811, 941, 1291), DisplayRotation::Rotation0);
        assert_eq!(r, Rect::new(140, 810, 940, 1290));
    }

    #[test]
    fn test_recognition_rotation_degrees() {
        assert_eq!(recognition_rotation_degrees(90, DisplayRotation::Rotation0), 90);
        assert_eq!(recognition_rotation_degrees(90, DisplayRotation::Rotation90), 0);
        assert_eq!(recognition_rotation_degrees(90, DisplayRotation::Rotation270), 180);
        assert_eq!(recognition_rotation_degrees(0, DisplayRotation::Rotation90), 270);
    }

    #[test]
    fn test_dimensions_swapped() {
        assert!(dimensions_swapped(90, DisplayRotation::Rotation0));
        assert!(!dimensions_swapped(90, DisplayRotation::Rotation90));
        assert!(dimensions_swapped(0, DisplayRotation::Rotation270));
        assert!(!dimensions_swapped(180, DisplayRotation::Rotation180));
    }

    fn turn_strategy() -> impl Strategy<Value = QuarterTurn> {
        prop_oneof![Just(QuarterTurn::Clockwise), Just(QuarterTurn::CounterClockwise)]
    }

    proptest! {
        #[test]
        fn proptest_forward_output_is_valid(
            view_w in 16u32..3000,
            view_h in 16u32..3000,
            buf_w in 16u32..4000,
            buf_h in 16u32..4000,
            turn in turn_strategy(),
            l in -500i32..3500,
            t in -500i32..3500,
            w in 0i32..3000,
            h in 0i32..3000,
        ) {
            let mapper = RotationMapper::new(Size::new(view_w, view_h), Size::new(buf_w, buf_h));
            let r = mapper.view_rect_to_buffer(Rect::new(l, t, l + w, t + h), turn);
            prop_assert!(r.left >= 0 && r.top >= 0);
            prop_assert!(r.left < r.right && r.right <= buf_w as i32);
            prop_assert!(r.top < r.bottom && r.bottom <= buf_h as i32);
            prop_assert!(r.left % 2 == 0 && r.top % 2 == 0);
            prop_assert!(r.width() % 2 == 0 && r.height() % 2 == 0);
        }

        #[test]
        fn proptest_round_trip_within_rounding(
            view_w in 200u32..2600,
            view_h in 200u32..2600,
            buf_w in 200u32..2600,
            buf_h in 200u32..2600,
            turn in turn_strategy(),
            fx in 0.0f32..0.5,
            fy in 0.0f32..0.5,
            fw in 0.2f32..0.5,
            fh in 0.2f32..0.5,
        ) {
            let view = Size::new(view_w, view_h);
            let mapper = RotationMapper::new(view, Size::new(buf_w, buf_h));
            let l = (fx * view_w as f32) as i32;
            let t = (fy * view_h as f32) as i32;
            let r = l + (fw * view_w as f32) as i32;
            let b = t + (fh * view_h as f32) as i32;
            let capture = Rect::new(l, t, r, b);

            let back = mapper.buffer_rect_to_view(mapper.view_rect_to_buffer(capture, turn), turn);

            // 缓冲侧舍入到偶数像素最多偏移 1.5 像素，视图侧再按缩放放大并取整
            let scale = (view_w as f32 / buf_h as f32).max(view_h as f32 / buf_w as f32);
            let tolerance = (1.5 * scale).ceil() as i32 + 1;
            prop_assert!((back.left - capture.left).abs() <= tolerance);
            prop_assert!((back.top - capture.top).abs() <= tolerance);
            prop_assert!((back.right - capture.right).abs() <= tolerance);
            prop_assert!((back.bottom - capture.bottom).abs() <= tolerance);
        }
    }
}
