//! 扫描会话：串行化的会话状态 + 单飞行识别许可
//!
//! 历史、扫描开关、最新文本都放在同一把锁里；忙标志单独用原子量，由
//! `RecognitionPermit` 持有，许可被 drop 时自动清除。重置会递增代数，
//! 重置之前发出的许可在完成时被丢弃，不会污染新会话。

use crate::core::card::{extract, ConsensusAggregator, ConsensusStatus, FinalRecord, ScanProgress};
use crate::core::config::ScanConfig;
use crate::core::error::{FrameError, RecognitionError};
use crate::core::frame::{
    crop_and_compress, crop_view_raster, decode_raster, rotate_raster, to_packed_chroma,
    PlanarFrame,
};
use crate::core::geometry::{
    recognition_rotation_degrees, DisplayRotation, Rect, RotationMapper, Size,
};
use crate::core::recognizer::TextRecognizer;
use image::DynamicImage;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// 一帧输入
pub enum FrameSource {
    /// 相机原始三平面帧（未旋转）
    Planar(PlanarFrame),
    /// 竖屏时直接从预览视图截取的位图（已正立）
    ViewRaster(DynamicImage),
}

/// 本帧的取景参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureRequest {
    /// 取景框（屏幕坐标）
    pub capture_rect: Rect,
    pub view: Size,
    pub rotation: DisplayRotation,
    pub sensor_orientation: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoFrame,
    Busy,
    NotScanning,
    Conversion,
}

/// 一次识别的独占许可；drop 即释放忙标志
#[derive(Debug)]
pub struct RecognitionPermit {
    busy: Arc<AtomicBool>,
    generation: u64,
}

impl RecognitionPermit {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for RecognitionPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// 已裁剪并正立化、等待识别的图像
#[derive(Debug)]
pub struct PreparedFrame {
    pub image: DynamicImage,
    pub permit: RecognitionPermit,
}

#[derive(Debug)]
pub enum FrameOutcome {
    Ready(PreparedFrame),
    Skipped(SkipReason),
}

/// 同一把锁下读取的会话快照
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSnapshot {
    pub status: ConsensusStatus,
    pub progress: ScanProgress,
    pub live_text: String,
}

struct SessionState {
    aggregator: ConsensusAggregator,
    scanning_active: bool,
    latest_text: String,
    generation: u64,
    debug_rect: Option<Rect>,
}

impl SessionState {
    fn status(&self) -> ConsensusStatus {
        match self.aggregator.final_record() {
            Some(record) => ConsensusStatus::Finalized(record.clone()),
            None => ConsensusStatus::Collecting(self.aggregator.progress()),
        }
    }
}

pub struct ScanSession {
    config: ScanConfig,
    state: Mutex<SessionState>,
    busy: Arc<AtomicBool>,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::with_config(ScanConfig::default())
    }

    pub fn with_config(config: ScanConfig) -> Self {
        info!(
            "🪪 ScanSession: created (K={}, jpeg q={})",
            config.history_limit, config.jpeg_quality
        );
        Self {
            state: Mutex::new(SessionState {
                aggregator: ConsensusAggregator::new(config.history_limit),
                scanning_active: true,
                latest_text: String::new(),
                generation: 0,
                debug_rect: None,
            }),
            busy: Arc::new(AtomicBool::new(false)),
            config,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    // 状态总是在持锁期间整体更新，中毒后仍可继续使用
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 尝试占用识别通道；忙或已停止扫描时返回跳过原因
    pub fn try_begin(&self) -> Result<RecognitionPermit, SkipReason> {
        let state = self.lock();
        if !state.scanning_active {
            return Err(SkipReason::NotScanning);
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SkipReason::Busy);
        }
        Ok(RecognitionPermit {
            busy: Arc::clone(&self.busy),
            generation: state.generation,
        })
    }

    /// 帧到达：刷新调试框，占用许可，裁剪并正立化
    ///
    /// 帧在任何返回路径上都会被释放；转换失败时许可随之释放。
    pub fn prepare_frame(&self, source: Option<FrameSource>, request: &CaptureRequest) -> FrameOutcome {
        let Some(source) = source else {
            debug!("⏭️ No frame available");
            return FrameOutcome::Skipped(SkipReason::NoFrame);
        };

        if let FrameSource::Planar(frame) = &source {
            let mapper = RotationMapper::new(request.view, Size::new(frame.width, frame.height));
            let debug_rect = mapper.debug_rect(request.capture_rect, request.rotation);
            self.lock().debug_rect = debug_rect;
        }

        let permit = match self.try_begin() {
            Ok(permit) => permit,
            Err(reason) => return FrameOutcome::Skipped(reason),
        };

        match self.render(source, request) {
            Ok(image) => FrameOutcome::Ready(PreparedFrame { image, permit }),
            Err(e) => {
                warn!("⚠️ Frame conversion failed, skipping: {}", e);
                FrameOutcome::Skipped(SkipReason::Conversion)
            }
        }
    }

    fn render(&self, source: FrameSource, request: &CaptureRequest) -> Result<DynamicImage, FrameError> {
        match source {
            FrameSource::Planar(frame) => {
                debug!(
                    "🎞️ Frame {}x{} @ {}ms",
                    frame.width, frame.height, frame.timestamp_ms
                );
                let mapper = RotationMapper::new(request.view, Size::new(frame.width, frame.height));
                let rect = mapper.capture_rect_in_buffer(request.capture_rect, request.rotation);
                let packed = to_packed_chroma(&frame)?;
                drop(frame);

                let jpeg = crop_and_compress(&packed, rect, self.config.jpeg_quality)?;
                let degrees = recognition_rotation_degrees(request.sensor_orientation, request.rotation);
                rotate_raster(decode_raster(&jpeg)?, degrees)
            }
            FrameSource::ViewRaster(image) => {
                let r = request.capture_rect;
                crop_view_raster(&image, r)
                    .ok_or(FrameError::CropOutOfBounds((r.left, r.top, r.right, r.bottom)))
            }
        }
    }

    /// 识别完成（可在任意线程调用）
    ///
    /// 失败不改动历史；重置之前发出的许可直接丢弃结果。
    pub fn complete(
        &self,
        permit: RecognitionPermit,
        result: Result<String, RecognitionError>,
    ) -> ConsensusStatus {
        let mut state = self.lock();

        let status = if permit.generation != state.generation {
            debug!(
                "🗑️ Discarding result from generation {} (current {})",
                permit.generation, state.generation
            );
            state.status()
        } else {
            match result {
                Err(e) => {
                    warn!("⚠️ Recognition failed: {}", e);
                    state.status()
                }
                Ok(text) => Self::ingest_text(&mut state, &text),
            }
        };

        drop(state);
        drop(permit);
        status
    }

    fn ingest_text(state: &mut SessionState, text: &str) -> ConsensusStatus {
        let candidates = extract(text);
        let status = state.aggregator.ingest(&candidates);

        match &status {
            ConsensusStatus::Collecting(progress) => {
                state.latest_text = format!("{}\n\n{}", progress, text);
            }
            ConsensusStatus::Finalized(record) => {
                state.scanning_active = false;
                state.latest_text = record.report();
                info!("🏁 Scan finalized\n{}", record);
            }
        }
        status
    }

    /// 同步便捷路径：准备帧 → 识别 → 完成
    pub fn process_frame(
        &self,
        source: Option<FrameSource>,
        request: &CaptureRequest,
        recognizer: &dyn TextRecognizer,
    ) -> Option<ConsensusStatus> {
        match self.prepare_frame(source, request) {
            FrameOutcome::Ready(prepared) => {
                let result = recognizer.recognize(&prepared.image, 0);
                Some(self.complete(prepared.permit, result))
            }
            FrameOutcome::Skipped(_) => None,
        }
    }

    /// 清空历史并重新开始扫描
    pub fn reset(&self) {
        let mut state = self.lock();
        state.aggregator.reset();
        state.scanning_active = true;
        state.latest_text.clear();
        state.debug_rect = None;
        state.generation = state.generation.wrapping_add(1);
        info!("🔄 ScanSession: reset (generation {})", state.generation);
    }

    pub fn status(&self) -> ConsensusStatus {
        self.lock().status()
    }

    pub fn snapshot(&self) -> ScanSnapshot {
        let state = self.lock();
        ScanSnapshot {
            status: state.status(),
            progress: state.aggregator.progress(),
            live_text: state.latest_text.clone(),
        }
    }

    pub fn progress(&self) -> ScanProgress {
        self.lock().aggregator.progress()
    }

    pub fn final_record(&self) -> Option<FinalRecord> {
        self.lock().aggregator.final_record().cloned()
    }

    /// 进度报告 + 最近一次识别原文；定稿后为最终报告
    pub fn live_text(&self) -> String {
        self.lock().latest_text.clone()
    }

    pub fn debug_rect(&self) -> Option<Rect> {
        self.lock().debug_rect
    }

    pub fn history_dump(&self) -> String {
        self.lock().aggregator.history_dump()
    }

    pub fn is_scanning(&self) -> bool {
        self.lock().scanning_active
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}
