pub mod card;
pub mod config;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod recognizer;
pub mod session;

pub use config::ScanConfig;
pub use error::{FrameError, RecognitionError};
pub use recognizer::{MockTextRecognizer, TextRecognizer};
pub use session::{
    CaptureRequest, FrameOutcome, FrameSource, PreparedFrame, RecognitionPermit, ScanSession,
    ScanSnapshot, SkipReason,
};
