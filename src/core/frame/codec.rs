//! YUV_420_888 → NV21 打包、ROI 裁剪压缩、正立化旋转

use crate::core::error::FrameError;
use crate::core::frame::planar::PlanarFrame;
use crate::core::geometry::{Rect, Size};
use image::{DynamicImage, GenericImageView, ImageFormat, ImageOutputFormat, RgbImage};
use log::debug;
use rayon::prelude::*;
use std::io::Cursor;

/// NV21：Y 平面之后紧跟交错的 VU 平面（半分辨率）
#[derive(Debug, Clone)]
pub struct PackedFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl PackedFrame {
    fn luma_len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    fn chroma_row_len(&self) -> usize {
        (self.width as usize / 2) * 2
    }

    /// 取 (x, y) 处的 YUV 采样
    fn sample(&self, x: usize, y: usize) -> (u8, u8, u8) {
        let w = self.width as usize;
        let cw = (self.width as usize / 2).max(1);
        let ch = (self.height as usize / 2).max(1);
        let cx = (x / 2).min(cw - 1);
        let cy = (y / 2).min(ch - 1);

        let vu = self.luma_len() + cy * self.chroma_row_len() + cx * 2;
        (self.data[y * w + x], self.data[vu + 1], self.data[vu])
    }
}

/// 将带任意 row/pixel stride 的三平面帧转为 NV21
///
/// 所有读取都按 stride 索引，不假设缓冲紧密排列，行尾填充不会混入结果。
pub fn to_packed_chroma(frame: &PlanarFrame) -> Result<PackedFrame, FrameError> {
    frame.validate()?;

    let w = frame.width as usize;
    let h = frame.height as usize;
    let cw = frame.chroma_width();
    let ch = frame.chroma_height();

    let mut out = vec![0u8; w * h + cw * ch * 2];
    let (luma, chroma) = out.split_at_mut(w * h);

    let y_plane = &frame.y;
    luma.par_chunks_mut(w).enumerate().for_each(|(row, dst)| {
        let base = y_plane.index(row, 0);
        if y_plane.pixel_stride == 1 {
            dst.copy_from_slice(&y_plane.data[base..base + w]);
        } else {
            for (col, px) in dst.iter_mut().enumerate() {
                *px = y_plane.data[y_plane.index(row, col)];
            }
        }
    });

    if cw > 0 {
        let (u_plane, v_plane) = (&frame.u, &frame.v);
        chroma
            .par_chunks_mut(cw * 2)
            .enumerate()
            .for_each(|(row, dst)| {
                for (col, vu) in dst.chunks_exact_mut(2).enumerate() {
                    vu[0] = v_plane.data[v_plane.index(row, col)];
                    vu[1] = u_plane.data[u_plane.index(row, col)];
                }
            });
    }

    debug!("NV21 packed: {}x{} ({} bytes)", w, h, out.len());
    Ok(PackedFrame {
        width: frame.width,
        height: frame.height,
        data: out,
    })
}

/// 只把 `rect` 范围转为 RGB 并压缩为 JPEG
pub fn crop_and_compress(packed: &PackedFrame, rect: Rect, quality: u8) -> Result<Vec<u8>, FrameError> {
    let out_of_bounds = || FrameError::CropOutOfBounds((rect.left, rect.top, rect.right, rect.bottom));

    if rect.is_empty()
        || rect.left < 0
        || rect.top < 0
        || rect.right > packed.width as i32
        || rect.bottom > packed.height as i32
    {
        return Err(out_of_bounds());
    }

    let expected = packed.luma_len() + (packed.height as usize / 2) * packed.chroma_row_len();
    if packed.data.len() < expected {
        return Err(FrameError::PlaneTooShort {
            plane: "NV21",
            index: expected - 1,
            len: packed.data.len(),
        });
    }

    let crop_w = rect.width() as u32;
    let crop_h = rect.height() as u32;
    let mut rgb = Vec::with_capacity(crop_w as usize * crop_h as usize * 3);

    for y in rect.top as usize..rect.bottom as usize {
        for x in rect.left as usize..rect.right as usize {
            let (y_val, u_val, v_val) = packed.sample(x, y);
            rgb.extend_from_slice(&yuv_to_rgb(y_val, u_val, v_val));
        }
    }

    let img = RgbImage::from_raw(crop_w, crop_h, rgb).ok_or_else(out_of_bounds)?;
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageOutputFormat::Jpeg(quality))?;

    let jpeg = buffer.into_inner();
    debug!(
        "ROI {}x{} @ ({}, {}) → JPEG {} bytes (q={})",
        crop_w,
        crop_h,
        rect.left,
        rect.top,
        jpeg.len(),
        quality
    );
    Ok(jpeg)
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y_val = y as f32;
    let u_val = u as f32 - 128.0;
    let v_val = v as f32 - 128.0;

    let r = (y_val + 1.402 * v_val).clamp(0.0, 255.0) as u8;
    let g = (y_val - 0.344136 * u_val - 0.714136 * v_val).clamp(0.0, 255.0) as u8;
    let b = (y_val + 1.772 * u_val).clamp(0.0, 255.0) as u8;
    [r, g, b]
}

/// 正立后的图像重新编码为 JPEG，交给宿主侧识别引擎
pub fn encode_raster(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, FrameError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .to_rgb8()
        .write_to(&mut buffer, ImageOutputFormat::Jpeg(quality))?;
    Ok(buffer.into_inner())
}

pub fn decode_raster(bytes: &[u8]) -> Result<DynamicImage, FrameError> {
    Ok(image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)?)
}

/// 按 90° 的倍数顺时针旋转（识别引擎固定以 0° 调用）
pub fn rotate_raster(image: DynamicImage, degrees: i32) -> Result<DynamicImage, FrameError> {
    match degrees.rem_euclid(360) {
        0 => Ok(image),
        90 => Ok(image.rotate90()),
        180 => Ok(image.rotate180()),
        270 => Ok(image.rotate270()),
        _ => Err(FrameError::UnsupportedRotation(degrees)),
    }
}

/// 竖屏路径：直接从视图截图裁出取景框，矩形先夹到图像范围内
pub fn crop_view_raster(image: &DynamicImage, rect: Rect) -> Option<DynamicImage> {
    let (img_w, img_h) = image.dimensions();
    let r = rect.clamp_to(Size::new(img_w, img_h));
    if r.is_empty() {
        return None;
    }

    Some(image.crop_imm(
        r.left as u32,
        r.top as u32,
        r.width() as u32,
        r.height() as u32,
    ))
}
