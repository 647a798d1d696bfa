//! 证件扫描器

use crate::core::card::ConsensusStatus;
use crate::core::error::RecognitionError;
use crate::core::frame::{encode_raster, Plane, PlanarFrame};
use crate::core::geometry::{
    choose_preview_size, dimensions_swapped, recognition_rotation_degrees, CaptureWindow,
    DisplayRotation, Rect, Size,
};
use crate::core::session::{
    CaptureRequest, FrameOutcome, FrameSource, RecognitionPermit, ScanSession,
};
use crate::core::ScanConfig;
use flutter_rust_bridge::frb;
use log::{debug, info, warn};
use std::sync::{Mutex, PoisonError};

/// 相机 YUV_420_888 帧（三平面 + stride）
#[derive(Debug, Clone)]
pub struct PlanarFrameData {
    pub width: u32,
    pub height: u32,
    pub y_plane: Vec<u8>,
    pub u_plane: Vec<u8>,
    pub v_plane: Vec<u8>,
    pub y_row_stride: u32,
    pub uv_row_stride: u32,
    pub uv_pixel_stride: u32,
    pub timestamp_ms: u64,
}

impl PlanarFrameData {
    fn into_planar(self) -> PlanarFrame {
        PlanarFrame::new(
            self.width,
            self.height,
            Plane::new(self.y_plane, self.y_row_stride as usize, 1),
            Plane::new(
                self.u_plane,
                self.uv_row_stride as usize,
                self.uv_pixel_stride as usize,
            ),
            Plane::new(
                self.v_plane,
                self.uv_row_stride as usize,
                self.uv_pixel_stride as usize,
            ),
        )
        .with_timestamp(self.timestamp_ms)
    }
}

/// 矩形（屏幕或缓冲坐标）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl From<Rect> for ScanRect {
    fn from(r: Rect) -> Self {
        Self {
            left: r.left,
            top: r.top,
            right: r.right,
            bottom: r.bottom,
        }
    }
}

impl From<ScanRect> for Rect {
    fn from(r: ScanRect) -> Self {
        Rect::new(r.left, r.top, r.right, r.bottom)
    }
}

/// 本帧取景参数
#[derive(Debug, Clone, Copy)]
pub struct CaptureParams {
    pub capture_rect: ScanRect,
    pub view_width: u32,
    pub view_height: u32,
    /// 0 / 90 / 180 / 270
    pub display_rotation: i32,
    pub sensor_orientation: i32,
}

impl CaptureParams {
    fn to_request(self) -> Option<CaptureRequest> {
        let Some(rotation) = DisplayRotation::from_degrees(self.display_rotation) else {
            warn!("⚠️ Unsupported display rotation: {}", self.display_rotation);
            return None;
        };
        Some(CaptureRequest {
            capture_rect: self.capture_rect.into(),
            view: Size::new(self.view_width, self.view_height),
            rotation,
            sensor_orientation: self.sensor_orientation,
        })
    }
}

/// 扫描状态
#[derive(Debug, Clone)]
pub struct ScanStatusInfo {
    pub finalized: bool,
    /// 进度 + 最新识别原文；定稿后为最终报告
    pub live_text: String,
    /// 各字段已累积样本数（氏名、生年月日、住所、交付日、有効期限、番号）
    pub counts: Vec<u32>,
    pub limit: u32,
}

/// 证件扫描器 - 取景框裁剪 + 多帧投票
///
/// ```dart
/// final scanner = IdCardScanner.create();
/// final jpeg = scanner.submitFrame(frame: frame, capture: params);
/// if (jpeg != null) {
///   final text = await mlkit.recognize(jpeg);
///   final status = scanner.completeRecognition(text: text);
/// }
/// ```
#[frb(opaque)]
pub struct IdCardScanner {
    session: ScanSession,
    pending: Mutex<Option<RecognitionPermit>>,
}

impl IdCardScanner {
    /// 默认配置（每字段 5 帧）
    #[frb(sync)]
    pub fn create() -> Self {
        Self::with_config(ScanConfig::default())
    }

    /// 自定义每字段样本数
    #[frb(sync)]
    pub fn create_with_limit(history_limit: u32) -> Self {
        Self::with_config(ScanConfig {
            history_limit: history_limit as usize,
            ..ScanConfig::default()
        })
    }

    /// 光线好时少采几帧（每字段 3 帧）
    #[frb(sync)]
    pub fn create_quick() -> Self {
        Self::with_config(ScanConfig::for_quick_scan())
    }

    /// 反光、磨损严重的证件多采几帧（每字段 7 帧）
    #[frb(sync)]
    pub fn create_strict() -> Self {
        Self::with_config(ScanConfig::for_strict_scan())
    }

    fn with_config(config: ScanConfig) -> Self {
        crate::init_logging();
        info!("🪪 IdCardScanner: created");
        Self {
            session: ScanSession::with_config(config),
            pending: Mutex::new(None),
        }
    }

    /// 提交一帧相机数据
    ///
    /// 返回裁剪并正立化后的 JPEG；忙、已定稿或转换失败时返回 None（帧被丢弃）。
    #[frb]
    pub fn submit_frame(&self, frame: PlanarFrameData, capture: CaptureParams) -> Option<Vec<u8>> {
        let request = capture.to_request()?;
        let outcome = self
            .session
            .prepare_frame(Some(FrameSource::Planar(frame.into_planar())), &request);
        self.hand_off(outcome)
    }

    /// 竖屏路径：提交预览视图截图（PNG/JPEG 编码）
    #[frb]
    pub fn submit_view_raster(&self, encoded: Vec<u8>, capture: CaptureParams) -> Option<Vec<u8>> {
        let request = capture.to_request()?;
        let source = match image::load_from_memory(&encoded) {
            Ok(image) => Some(FrameSource::ViewRaster(image)),
            Err(e) => {
                warn!("⚠️ View raster decode failed: {}", e);
                None
            }
        };
        let outcome = self.session.prepare_frame(source, &request);
        self.hand_off(outcome)
    }

    fn hand_off(&self, outcome: FrameOutcome) -> Option<Vec<u8>> {
        let prepared = match outcome {
            FrameOutcome::Ready(prepared) => prepared,
            FrameOutcome::Skipped(reason) => {
                debug!("⏭️ Frame skipped: {:?}", reason);
                return None;
            }
        };

        match encode_raster(&prepared.image, self.session.config().jpeg_quality) {
            Ok(jpeg) => {
                *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(prepared.permit);
                Some(jpeg)
            }
            Err(e) => {
                warn!("⚠️ Failed to encode upright crop: {}", e);
                None
            }
        }
    }

    /// 回传识别结果；`text` 为 None 表示识别失败
    #[frb(sync)]
    pub fn complete_recognition(&self, text: Option<String>) -> ScanStatusInfo {
        let permit = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(permit) = permit else {
            warn!("⚠️ completeRecognition called without a pending frame");
            return self.status();
        };

        let result = text.ok_or_else(|| RecognitionError::Engine("host recognizer failed".to_string()));
        self.session.complete(permit, result);
        self.status()
    }

    /// 重新扫描
    #[frb(sync)]
    pub fn reset(&self) {
        self.session.reset();
        // 宿主可能永远不回传上一帧的结果，丢弃许可以释放忙标志
        let stale = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(stale);
    }

    #[frb(sync)]
    pub fn status(&self) -> ScanStatusInfo {
        let snapshot = self.session.snapshot();
        ScanStatusInfo {
            finalized: matches!(snapshot.status, ConsensusStatus::Finalized(_)),
            live_text: snapshot.live_text,
            counts: snapshot.progress.counts.iter().map(|&c| c as u32).collect(),
            limit: snapshot.progress.limit as u32,
        }
    }

    /// 实际裁剪区域映射回屏幕后的调试框
    #[frb(sync, getter)]
    pub fn debug_rect(&self) -> Option<ScanRect> {
        self.session.debug_rect().map(ScanRect::from)
    }

    #[frb(sync, getter)]
    pub fn live_text(&self) -> String {
        self.session.live_text()
    }

    /// 定稿结果（JSON），未定稿时为 None
    #[frb(sync)]
    pub fn final_record_json(&self) -> Option<String> {
        let record = self.session.final_record()?;
        match serde_json::to_string(&record) {
            Ok(json) => Some(json),
            Err(e) => {
                warn!("⚠️ Failed to serialize final record: {}", e);
                None
            }
        }
    }

    #[frb(sync)]
    pub fn history_dump(&self) -> String {
        self.session.history_dump()
    }

    /// 识别引擎需要的旋转角（未正立化的缓冲）
    #[frb(sync)]
    pub fn rotation_degrees(sensor_orientation: i32, display_rotation: i32) -> Option<i32> {
        DisplayRotation::from_degrees(display_rotation)
            .map(|d| recognition_rotation_degrees(sensor_orientation, d))
    }

    /// 缓冲宽高是否相对屏幕互换（选择预览尺寸前使用）
    #[frb(sync)]
    pub fn dimensions_swapped(sensor_orientation: i32, display_rotation: i32) -> bool {
        DisplayRotation::from_degrees(display_rotation)
            .is_some_and(|d| dimensions_swapped(sensor_orientation, d))
    }

    /// 居中的取景框（屏幕坐标）
    #[frb(sync)]
    pub fn capture_window(&self, view_width: u32, view_height: u32, density: f32) -> ScanRect {
        CaptureWindow::centered_with_box(
            Size::new(view_width, view_height),
            density,
            self.session.config().capture_box_dp,
        )
        .rect
        .into()
    }

    /// 从候选中选择预览尺寸；`choices` 为 [w0, h0, w1, h1, ...]
    #[frb(sync)]
    pub fn choose_preview_size(
        choices: Vec<u32>,
        view_width: u32,
        view_height: u32,
        swapped: bool,
    ) -> Option<Vec<u32>> {
        let sizes: Vec<Size> = choices
            .chunks_exact(2)
            .map(|c| Size::new(c[0], c[1]))
            .collect();
        choose_preview_size(&sizes, Size::new(view_width, view_height), swapped)
            .map(|s| vec![s.width, s.height])
    }
}

impl Drop for IdCardScanner {
    fn drop(&mut self) {
        info!("🗑️ IdCardScanner: released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LICENSE_TEXT: &str = "氏名 山田 太郎 昭和50年 1月 1日生\n\
        住所 東京都千代田区霞が関2－1－2\n\
        交付 令和03年04月01日 12345\n\
        2026年(令和08年)02月01日まで有効\n\
        第 123456789012 号";

    /// 行尾带填充、UV 交错（pixel_stride = 2）的帧
    fn padded_frame() -> PlanarFrameData {
        let (w, h) = (64u32, 48u32);
        let y_stride = 72;
        let uv_stride = 72;
        PlanarFrameData {
            width: w,
            height: h,
            y_plane: vec![128; y_stride * h as usize],
            u_plane: vec![128; uv_stride * (h as usize / 2)],
            v_plane: vec![128; uv_stride * (h as usize / 2)],
            y_row_stride: y_stride as u32,
            uv_row_stride: uv_stride as u32,
            uv_pixel_stride: 2,
            timestamp_ms: 0,
        }
    }

    fn params() -> CaptureParams {
        CaptureParams {
            capture_rect: ScanRect {
                left: 8,
                top: 8,
                right: 40,
                bottom: 32,
            },
            view_width: 64,
            view_height: 48,
            display_rotation: 0,
            sensor_orientation: 0,
        }
    }

    #[test]
    fn test_submit_and_complete() {
        let scanner = IdCardScanner::create_with_limit(2);
        for round in 0..2 {
            let jpeg = scanner.submit_frame(padded_frame(), params()).expect("应返回 JPEG");
            assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
            let status = scanner.complete_recognition(Some(LICENSE_TEXT.to_string()));
            assert_eq!(status.finalized, round == 1);
        }

        let json = scanner.final_record_json().expect("应已定稿");
        assert!(json.contains("\"number\":\"123456789012\""));
        assert!(scanner.submit_frame(padded_frame(), params()).is_none());

        scanner.reset();
        assert!(scanner.final_record_json().is_none());
        assert_eq!(scanner.status().counts, vec![0; 6]);
    }

    #[test]
    fn test_busy_until_completed() {
        let scanner = IdCardScanner::create();
        assert!(scanner.submit_frame(padded_frame(), params()).is_some());
        assert!(scanner.submit_frame(padded_frame(), params()).is_none());

        let status = scanner.complete_recognition(None);
        assert!(!status.finalized);
        assert_eq!(status.counts, vec![0; 6]);
        assert!(scanner.submit_frame(padded_frame(), params()).is_some());
    }

    #[test]
    fn test_complete_without_pending_frame() {
        let scanner = IdCardScanner::create();
        let status = scanner.complete_recognition(Some(LICENSE_TEXT.to_string()));
        assert_eq!(status.counts, vec![0; 6]);
    }

    #[test]
    fn test_invalid_rotation_rejected() {
        let scanner = IdCardScanner::create();
        let mut p = params();
        p.display_rotation = 45;
        assert!(scanner.submit_frame(padded_frame(), p).is_none());
        assert_eq!(IdCardScanner::rotation_degrees(90, 45), None);
        assert_eq!(IdCardScanner::rotation_degrees(90, 270), Some(180));
    }

    #[test]
    fn test_helpers() {
        let window = IdCardScanner::create().capture_window(1080, 1920, 2.0);
        assert_eq!(window.right - window.left, 500);
        assert_eq!(window.bottom - window.top, 300);

        let size = IdCardScanner::choose_preview_size(vec![640, 480, 1920, 1080], 1080, 1920, true);
        assert_eq!(size, Some(vec![1920, 1080]));
        assert!(IdCardScanner::dimensions_swapped(90, 0));
        assert!(!IdCardScanner::dimensions_swapped(90, 90));
    }

    #[test]
    fn test_reset_releases_unanswered_frame() {
        let scanner = IdCardScanner::create();
        assert!(scanner.submit_frame(padded_frame(), params()).is_some());
        // 宿主识别失败且没有回调 completeRecognition
        assert!(scanner.submit_frame(padded_frame(), params()).is_none());

        scanner.reset();
        assert!(scanner.submit_frame(padded_frame(), params()).is_some());

        let status = scanner.complete_recognition(Some(LICENSE_TEXT.to_string()));
        assert_eq!(status.counts, vec![1; 6]);
    }

    #[test]
    fn test_presets_set_limit() {
        assert_eq!(IdCardScanner::create_quick().status().limit, 3);
        assert_eq!(IdCardScanner::create_strict().status().limit, 7);
        assert_eq!(IdCardScanner::create().status().limit, 5);
    }
}
