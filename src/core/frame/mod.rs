//! 帧缓冲：三平面 YUV → NV21，ROI 裁剪压缩，正立化旋转

pub mod codec;
pub mod planar;

pub use codec::{
    crop_and_compress, crop_view_raster, decode_raster, encode_raster, rotate_raster,
    to_packed_chroma, PackedFrame,
};
pub use planar::{Plane, PlanarFrame};
