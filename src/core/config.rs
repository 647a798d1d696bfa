use crate::core::geometry::CAPTURE_BOX_DP;

/// 扫描会话配置
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// 每个字段需要累积的样本数 K，全部填满才投票定稿
    pub history_limit: usize,
    /// 裁剪区域的 JPEG 压缩质量
    pub jpeg_quality: u8,
    /// 取景框尺寸（dp）
    pub capture_box_dp: (f32, f32),
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            history_limit: 5,
            jpeg_quality: 85,
            capture_box_dp: CAPTURE_BOX_DP,
        }
    }
}

impl ScanConfig {
    /// 光线好、证件清晰时少采几帧
    pub fn for_quick_scan() -> Self {
        Self {
            history_limit: 3,
            ..Self::default()
        }
    }

    /// 反光或磨损严重的证件多采几帧
    pub fn for_strict_scan() -> Self {
        Self {
            history_limit: 7,
            jpeg_quality: 92,
            ..Self::default()
        }
    }
}
