//! Model inference and the filtering layer that turns raw model output into
//! vocabulary-checked [`DetectionSet`]s.

mod annotate;
mod manifest;

use std::sync::Arc;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use visor_core::model::{BoundingBox, Detection, DetectionSet, Frame, Vocabulary};

use crate::error::DetectionError;

pub use annotate::{annotate, class_color};
pub use manifest::{DetectionManifest, ManifestDetector};

/// One prediction exactly as the model reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub class_id: usize,
    pub confidence: f32,
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
}

/// An inference backend.
///
/// Implementations receive RGB images and report class ids indexed into
/// [`Detector::class_names`]. `source` is the frame's origin tag, if any;
/// replay backends key on it, real models ignore it.
///
/// `infer` may block for the length of a model call. [`DetectionAdapter`]
/// runs it on the blocking pool, never on an async worker.
pub trait Detector: Send + Sync {
    fn class_names(&self) -> &[String];

    /// Run inference on one image.
    ///
    /// # Errors
    ///
    /// Returns `DetectionError::Inference` if the backend fails.
    fn infer(
        &self,
        image: &RgbImage,
        source: Option<&str>,
    ) -> Result<Vec<RawDetection>, DetectionError>;
}

/// Wraps a [`Detector`] with the vocabulary and confidence threshold.
#[derive(Clone)]
pub struct DetectionAdapter {
    detector: Arc<dyn Detector>,
    vocabulary: Arc<Vocabulary>,
    threshold: f32,
}

impl DetectionAdapter {
    #[must_use]
    pub fn new(detector: Arc<dyn Detector>, vocabulary: Arc<Vocabulary>, threshold: f32) -> Self {
        Self {
            detector,
            vocabulary,
            threshold,
        }
    }

    #[must_use]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Detect known classes in a frame.
    ///
    /// BGR frames are converted before inference. Class ids the model does
    /// not name are dropped.
    ///
    /// # Errors
    ///
    /// Returns `DetectionError` if inference fails.
    pub async fn detect(&self, frame: &Frame) -> Result<DetectionSet, DetectionError> {
        let (detections, _) = self.infer(frame).await?;
        Ok(detections)
    }

    /// Like [`detect`](Self::detect), also returning the frame with the
    /// retained detections drawn on it.
    ///
    /// # Errors
    ///
    /// Returns `DetectionError` if inference fails.
    pub async fn detect_annotated(
        &self,
        frame: &Frame,
    ) -> Result<(DetectionSet, RgbImage), DetectionError> {
        let (detections, image) = self.infer(frame).await?;
        let annotated = annotate(image, &detections);
        Ok((detections, annotated))
    }

    async fn infer(&self, frame: &Frame) -> Result<(DetectionSet, RgbImage), DetectionError> {
        let image = frame.normalized().into_owned();
        let source = frame.source().map(str::to_owned);
        let detector = Arc::clone(&self.detector);
        let (raw, image, source) = tokio::task::spawn_blocking(move || {
            let raw = detector.infer(&image, source.as_deref());
            (raw, image, source)
        })
        .await
        .map_err(|e| DetectionError::Inference(format!("inference task failed: {e}")))?;
        let raw = raw?;

        let names = self.detector.class_names();
        let named = raw.into_iter().filter_map(|det| {
            let Some(name) = names.get(det.class_id) else {
                tracing::debug!(class_id = det.class_id, "model reported an unnamed class id");
                return None;
            };
            let detection = Detection::new(name.clone(), det.confidence);
            Some(match det.bbox {
                Some(bbox) => detection.with_bbox(bbox),
                None => detection,
            })
        });

        let detections = DetectionSet::filtered(named, &self.vocabulary, self.threshold);
        tracing::debug!(
            source = source.as_deref().unwrap_or("-"),
            classes = detections.len(),
            label = detections.label(),
            "frame detected"
        );
        Ok((detections, image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::path::Path;

    struct FixedDetector {
        names: Vec<String>,
        output: Vec<RawDetection>,
    }

    impl Detector for FixedDetector {
        fn class_names(&self) -> &[String] {
            &self.names
        }

        fn infer(
            &self,
            image: &RgbImage,
            _source: Option<&str>,
        ) -> Result<Vec<RawDetection>, DetectionError> {
            // Red pixel in means the caller converted BGR correctly.
            if image.get_pixel(0, 0) != &Rgb([255, 0, 0]) {
                return Err(DetectionError::Inference("unexpected channel order".into()));
            }
            Ok(self.output.clone())
        }
    }

    fn adapter(output: Vec<RawDetection>) -> DetectionAdapter {
        let detector = FixedDetector {
            names: vec!["Bus Lane".into(), "Cats Eye".into(), "Pedestrian".into()],
            output,
        };
        DetectionAdapter::new(
            Arc::new(detector),
            Arc::new(Vocabulary::builtin(Path::new("assets"))),
            0.3,
        )
    }

    fn raw(class_id: usize, confidence: f32) -> RawDetection {
        RawDetection {
            class_id,
            confidence,
            bbox: None,
        }
    }

    #[tokio::test]
    async fn maps_ids_and_filters_by_vocabulary_and_threshold() {
        let adapter = adapter(vec![raw(0, 0.9), raw(1, 0.3), raw(2, 0.95), raw(7, 0.99)]);
        let frame = Frame::rgb(RgbImage::from_pixel(2, 2, Rgb([255, 0, 0])));

        let set = adapter.detect(&frame).await.unwrap();
        assert_eq!(set.class_names().into_iter().collect::<Vec<_>>(), vec!["Bus Lane"]);
    }

    #[tokio::test]
    async fn bgr_frames_are_normalized_before_inference() {
        let adapter = adapter(vec![raw(1, 0.8)]);
        let frame = Frame::bgr(RgbImage::from_pixel(2, 2, Rgb([0, 0, 255])));

        let set = adapter.detect(&frame).await.unwrap();
        assert_eq!(set.label(), "Cats Eye");
    }

    #[tokio::test]
    async fn annotated_output_keeps_frame_dimensions() {
        let bbox = BoundingBox {
            x: 0,
            y: 0,
            width: 3,
            height: 3,
        };
        let adapter = adapter(vec![RawDetection {
            class_id: 0,
            confidence: 0.9,
            bbox: Some(bbox),
        }]);
        let frame = Frame::rgb(RgbImage::from_pixel(8, 6, Rgb([255, 0, 0])));

        let (set, annotated) = adapter.detect_annotated(&frame).await.unwrap();
        assert!(set.contains("Bus Lane"));
        assert_eq!(annotated.dimensions(), (8, 6));
    }

    #[tokio::test]
    async fn inference_errors_are_returned() {
        let adapter = adapter(vec![raw(0, 0.9)]);
        let frame = Frame::rgb(RgbImage::from_pixel(2, 2, Rgb([0, 255, 0])));

        let err = adapter.detect(&frame).await.unwrap_err();
        assert!(matches!(err, DetectionError::Inference(_)));
    }
}
