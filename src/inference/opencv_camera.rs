//! OpenCV webcam capture

use image::RgbImage;
use opencv::{
    core::{Mat, Point, Scalar},
    highgui, imgproc,
    prelude::*,
    videoio,
};
use tracing::{debug, info};

use super::camera::{CameraDevice, Control};
use crate::utils::error::{ClassifierError, Result};

/// Title of the preview window
pub const WINDOW_TITLE: &str = "Gender Classifier";

const QUIT_KEY: i32 = 'q' as i32;

fn cv_err(e: opencv::Error) -> ClassifierError {
    ClassifierError::Camera(e.to_string())
}

/// A `VideoCapture` device with an optional preview window
pub struct OpenCvCamera {
    capture: videoio::VideoCapture,
    /// Last frame as captured (BGR), drawn on by `present`
    frame: Mat,
    show_window: bool,
}

impl OpenCvCamera {
    /// Open capture device `index` (0 is the default camera)
    pub fn open(index: i32, show_window: bool) -> Result<Self> {
        let capture = videoio::VideoCapture::new(index, videoio::CAP_ANY).map_err(cv_err)?;
        let opened = capture.is_opened().map_err(cv_err)?;
        if !opened {
            return Err(ClassifierError::Camera(format!(
                "could not open camera device {}",
                index
            )));
        }

        info!("Opened camera {}", index);
        Ok(Self {
            capture,
            frame: Mat::default(),
            show_window,
        })
    }
}

impl CameraDevice for OpenCvCamera {
    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        let grabbed = self.capture.read(&mut self.frame).map_err(cv_err)?;
        if !grabbed || self.frame.empty() {
            return Ok(None);
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color_def(&self.frame, &mut rgb, imgproc::COLOR_BGR2RGB).map_err(cv_err)?;

        let width = rgb.cols() as u32;
        let height = rgb.rows() as u32;
        let bytes = rgb.data_bytes().map_err(cv_err)?.to_vec();

        let image = RgbImage::from_raw(width, height, bytes).ok_or_else(|| {
            ClassifierError::Camera(format!("unexpected frame layout {}x{}", width, height))
        })?;
        Ok(Some(image))
    }

    fn present(&mut self, overlay: &str) -> Result<Control> {
        if !self.show_window {
            return Ok(Control::Continue);
        }

        imgproc::put_text(
            &mut self.frame,
            overlay,
            Point::new(10, 30),
            imgproc::FONT_HERSHEY_SIMPLEX,
            1.0,
            Scalar::new(0.0, 255.0, 0.0, 0.0),
            2,
            imgproc::LINE_8,
            false,
        )
        .map_err(cv_err)?;
        highgui::imshow(WINDOW_TITLE, &self.frame).map_err(cv_err)?;

        let key = highgui::wait_key(1).map_err(cv_err)?;
        if key & 0xFF == QUIT_KEY {
            debug!("Quit key pressed");
            return Ok(Control::Quit);
        }
        Ok(Control::Continue)
    }

    fn release(&mut self) -> Result<()> {
        self.capture.release().map_err(cv_err)?;
        if self.show_window {
            highgui::destroy_all_windows().map_err(cv_err)?;
        }
        Ok(())
    }
}
