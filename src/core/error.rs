use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("{plane} plane too short: need index {index}, have {len} bytes")]
    PlaneTooShort {
        plane: &'static str,
        index: usize,
        len: usize,
    },
    #[error("Invalid frame dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Crop rect {0:?} outside buffer")]
    CropOutOfBounds((i32, i32, i32, i32)),
    #[error("Unsupported rotation: {0} degrees")]
    UnsupportedRotation(i32),
    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("Recognition engine failed: {0}")]
    Engine(String),
    #[error("Recognition engine returned no text")]
    NoText,
}
