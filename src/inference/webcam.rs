//! Live classification loop
//!
//! read frame → classify → present overlay, until the user quits, the frame
//! limit is hit or the camera stops delivering. The device is released on
//! every exit path.

use burn::prelude::*;
use image::imageops::FilterType;
use tracing::{debug, warn};

use super::camera::{CameraDevice, Control};
use super::predictor::{PredictionResult, Predictor};
use crate::utils::error::Result;

/// Why the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    UserQuit,
    FrameLimit,
    /// No frame could be read
    CameraUnavailable,
}

/// What happened during a run
#[derive(Debug, Clone)]
pub struct WebcamSummary {
    pub frames: usize,
    pub stop_reason: StopReason,
    pub last_prediction: Option<PredictionResult>,
}

/// Text drawn on each frame
pub fn overlay_text(result: &PredictionResult) -> String {
    format!("Prediction: {}", result.label)
}

/// Classify frames until a stop condition
///
/// Frames are resized bilinearly, unlike files which use the training-time
/// nearest-neighbour resize.
pub fn run_webcam<B: Backend, C: CameraDevice>(
    predictor: &Predictor<B>,
    camera: &mut C,
    max_frames: Option<usize>,
) -> Result<WebcamSummary> {
    let outcome = classify_frames(predictor, camera, max_frames);
    let released = camera.release();

    let summary = outcome?;
    released?;
    Ok(summary)
}

fn classify_frames<B: Backend, C: CameraDevice>(
    predictor: &Predictor<B>,
    camera: &mut C,
    max_frames: Option<usize>,
) -> Result<WebcamSummary> {
    let mut frames = 0usize;
    let mut last_prediction = None;

    let stop_reason = loop {
        if max_frames.is_some_and(|limit| frames >= limit) {
            break StopReason::FrameLimit;
        }

        let Some(frame) = camera.read_frame()? else {
            warn!("could not access the camera");
            break StopReason::CameraUnavailable;
        };

        let result = predictor.predict_rgb(&frame, FilterType::Triangle)?;
        frames += 1;
        debug!("frame {}: {} (p = {:.3})", frames, result.label, result.probability);

        let control = camera.present(&overlay_text(&result))?;
        last_prediction = Some(result);

        if control == Control::Quit {
            break StopReason::UserQuit;
        }
    };

    Ok(WebcamSummary {
        frames,
        stop_reason,
        last_prediction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::camera::ReplayCamera;
    use crate::model::{ClassifierConfig, ImageClassifier, ModelMetadata};
    use crate::utils::error::ClassifierError;
    use burn_ndarray::NdArray;
    use image::{Rgb, RgbImage};

    type TestBackend = NdArray;

    fn predictor() -> Predictor<TestBackend> {
        let device = Default::default();
        let config = ClassifierConfig::new().with_input_size(24).with_dense_units(8);
        let model = ImageClassifier::new(&config, &device);
        let metadata = ModelMetadata::new(config, vec!["hombre".to_string(), "mujer".to_string()]);
        Predictor::from_parts(model, metadata, &device)
    }

    fn frames(n: usize) -> Vec<RgbImage> {
        (0..n)
            .map(|i| RgbImage::from_pixel(40, 30, Rgb([(i * 20) as u8, 50, 50])))
            .collect()
    }

    #[test]
    fn test_stops_when_camera_runs_dry() {
        let mut camera = ReplayCamera::new(frames(3));
        let summary = run_webcam(&predictor(), &mut camera, None).unwrap();

        assert_eq!(summary.frames, 3);
        assert_eq!(summary.stop_reason, StopReason::CameraUnavailable);
        assert_eq!(camera.overlays().len(), 3);
        assert!(camera.overlays().iter().all(|o| o.starts_with("Prediction: ")));
        assert!(camera.is_released());
    }

    #[test]
    fn test_no_frame_at_all() {
        let mut camera = ReplayCamera::new(Vec::new());
        let summary = run_webcam(&predictor(), &mut camera, None).unwrap();

        assert_eq!(summary.frames, 0);
        assert_eq!(summary.stop_reason, StopReason::CameraUnavailable);
        assert!(summary.last_prediction.is_none());
        assert!(camera.is_released());
    }

    #[test]
    fn test_user_quit() {
        let mut camera = ReplayCamera::new(frames(5)).quit_after(2);
        let summary = run_webcam(&predictor(), &mut camera, None).unwrap();

        assert_eq!(summary.frames, 2);
        assert_eq!(summary.stop_reason, StopReason::UserQuit);
        assert_eq!(camera.remaining(), 3);
    }

    #[test]
    fn test_frame_limit() {
        let mut camera = ReplayCamera::new(frames(5));
        let summary = run_webcam(&predictor(), &mut camera, Some(4)).unwrap();

        assert_eq!(summary.frames, 4);
        assert_eq!(summary.stop_reason, StopReason::FrameLimit);
        assert!(summary.last_prediction.is_some());
    }

    struct FailingCamera {
        released: bool,
    }

    impl CameraDevice for FailingCamera {
        fn read_frame(&mut self) -> Result<Option<RgbImage>> {
            Err(ClassifierError::Camera("device unplugged".to_string()))
        }

        fn present(&mut self, _overlay: &str) -> Result<Control> {
            Ok(Control::Continue)
        }

        fn release(&mut self) -> Result<()> {
            self.released = true;
            Ok(())
        }
    }

    #[test]
    fn test_release_on_error() {
        let mut camera = FailingCamera { released: false };
        let err = run_webcam(&predictor(), &mut camera, None).unwrap_err();
        assert!(matches!(err, ClassifierError::Camera(_)));
        assert!(camera.released);
    }
}
