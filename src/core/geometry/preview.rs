//! 预览尺寸选择与取景框布局

use super::rect::{Rect, Size};

/// 取景框尺寸（dp），与证件长宽比接近
pub const CAPTURE_BOX_DP: (f32, f32) = (250.0, 150.0);

/// 比目标尺寸小的候选会被加上的惩罚
const TOO_SMALL_PENALTY: f32 = 0.2;

/// 从相机支持的输出尺寸中选择与视图长宽比最接近的预览尺寸
///
/// `swapped` 为 true 时视图宽高先互换，再与（未旋转的）缓冲尺寸比较。
pub fn choose_preview_size(choices: &[Size], view: Size, swapped: bool) -> Option<Size> {
    let (target_w, target_h) = if swapped {
        (view.height, view.width)
    } else {
        (view.width, view.height)
    };
    let target_ratio = Size::new(target_w, target_h).aspect_ratio();

    let score = |s: &Size| {
        let ratio_diff = (s.aspect_ratio() - target_ratio).abs();
        let too_small = if s.width < target_w || s.height < target_h {
            TOO_SMALL_PENALTY
        } else {
            0.0
        };
        ratio_diff + too_small
    };

    choices
        .iter()
        .copied()
        .min_by(|a, b| score(a).total_cmp(&score(b)))
}

/// 屏幕上固定的取景框
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureWindow {
    pub rect: Rect,
}

impl CaptureWindow {
    /// 在视图中居中放置 `box_dp` 大小（默认 250x150dp）的取景框
    pub fn centered_with_box(view: Size, density: f32, box_dp: (f32, f32)) -> Self {
        let box_w = box_dp.0 * density;
        let box_h = box_dp.1 * density;
        let left = ((view.width as f32 - box_w) / 2.0) as i32;
        let top = ((view.height as f32 - box_h) / 2.0) as i32;
        let right = (left as f32 + box_w) as i32;
        let bottom = (top as f32 + box_h) as i32;

        Self {
            rect: Rect::new(left, top, right, bottom),
        }
    }
}
