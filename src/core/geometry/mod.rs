//! 取景框几何：视图坐标 ⇄ 未旋转缓冲坐标

pub mod preview;
pub mod rect;
pub mod rotation;

pub use preview::{choose_preview_size, CaptureWindow, CAPTURE_BOX_DP};
pub use rect::{Rect, Size};
pub use rotation::{
    dimensions_swapped, recognition_rotation_degrees, DisplayRotation, QuarterTurn,
    RotationMapper,
};
