use crate::core::error::FrameError;

/// 一个图像平面（对应 Android `Image.Plane`）
#[derive(Debug, Clone)]
pub struct Plane {
    pub data: Vec<u8>,
    pub row_stride: usize,
    pub pixel_stride: usize,
}

impl Plane {
    pub fn new(data: Vec<u8>, row_stride: usize, pixel_stride: usize) -> Self {
        Self {
            data,
            row_stride,
            pixel_stride,
        }
    }

    /// 紧密排列的平面（pixel_stride = 1，row_stride = width）
    pub fn packed(data: Vec<u8>, width: usize) -> Self {
        Self::new(data, width, 1)
    }

    #[inline]
    pub(crate) fn index(&self, row: usize, col: usize) -> usize {
        row * self.row_stride + col * self.pixel_stride
    }

    /// 确认读取 `rows x cols` 个采样不会越界
    ///
    /// 通过后 `index` 对范围内的任何行列都不会溢出。
    pub(crate) fn check_extent(
        &self,
        name: &'static str,
        rows: usize,
        cols: usize,
    ) -> Result<(), FrameError> {
        if rows == 0 || cols == 0 {
            return Ok(());
        }
        // 主机传入的 stride 可能极大，溢出按越界处理
        let last = (rows - 1)
            .checked_mul(self.row_stride)
            .and_then(|r| (cols - 1).checked_mul(self.pixel_stride)?.checked_add(r))
            .unwrap_or(usize::MAX);
        if last >= self.data.len() {
            return Err(FrameError::PlaneTooShort {
                plane: name,
                index: last,
                len: self.data.len(),
            });
        }
        Ok(())
    }
}

/// 相机传来的 YUV_420_888 帧：Y 全分辨率，U/V 水平垂直各半
///
/// 收到后不再修改；转换完成后由调用方释放（drop）。
#[derive(Debug, Clone)]
pub struct PlanarFrame {
    pub width: u32,
    pub height: u32,
    pub y: Plane,
    pub u: Plane,
    pub v: Plane,
    pub timestamp_ms: u64,
}

impl PlanarFrame {
    pub fn new(width: u32, height: u32, y: Plane, u: Plane, v: Plane) -> Self {
        Self {
            width,
            height,
            y,
            u,
            v,
            timestamp_ms: 0,
        }
    }

    pub fn with_timestamp(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    pub fn chroma_width(&self) -> usize {
        self.width as usize / 2
    }

    pub fn chroma_height(&self) -> usize {
        self.height as usize / 2
    }

    /// 检查尺寸与三个平面的长度
    pub fn validate(&self) -> Result<(), FrameError> {
        if self.width < 2 || self.height < 2 {
            return Err(FrameError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        let (w, h) = (self.width as usize, self.height as usize);
        let (cw, ch) = (self.chroma_width(), self.chroma_height());
        self.y.check_extent("Y", h, w)?;
        self.u.check_extent("U", ch, cw)?;
        self.v.check_extent("V", ch, cw)?;
        Ok(())
    }
}
