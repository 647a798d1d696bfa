use crate::core::error::RecognitionError;
use image::DynamicImage;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 文字识别引擎接口（ML Kit 等由宿主实现）
///
/// 会话总是传入已正立化的图像并以 `rotation_hint = 0` 调用。
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &DynamicImage, rotation_hint: i32) -> Result<String, RecognitionError>;
}

pub struct MockTextRecognizer {
    // 按调用序号返回识别结果
    responder: Box<dyn Fn(usize) -> Result<String, RecognitionError> + Send + Sync>,
    calls: AtomicUsize,
}

impl MockTextRecognizer {
    pub fn with_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::with_responder(move |_| Ok(text.clone()))
    }

    pub fn failing() -> Self {
        Self::with_responder(|_| Err(RecognitionError::Engine("mock failure".to_string())))
    }

    /// 依次返回给定文本，用完后一直返回最后一条
    pub fn with_sequence(texts: Vec<String>) -> Self {
        Self::with_responder(move |call| {
            texts
                .get(call)
                .or_else(|| texts.last())
                .cloned()
                .ok_or(RecognitionError::NoText)
        })
    }

    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(usize) -> Result<String, RecognitionError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextRecognizer for MockTextRecognizer {
    fn recognize(&self, _image: &DynamicImage, _rotation_hint: i32) -> Result<String, RecognitionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        (self.responder)(call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_sequence() {
        let image = DynamicImage::new_rgb8(4, 4);
        let mock = MockTextRecognizer::with_sequence(vec!["a".into(), "b".into()]);
        assert_eq!(mock.recognize(&image, 0).ok().as_deref(), Some("a"));
        assert_eq!(mock.recognize(&image, 0).ok().as_deref(), Some("b"));
        assert_eq!(mock.recognize(&image, 0).ok().as_deref(), Some("b"));
        assert_eq!(mock.call_count(), 3);
    }

    #[test]
    fn test_mock_failing() {
        let image = DynamicImage::new_rgb8(4, 4);
        assert!(MockTextRecognizer::failing().recognize(&image, 0).is_err());
    }
}
