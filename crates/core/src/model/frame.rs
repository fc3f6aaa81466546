use std::borrow::Cow;

use image::{DynamicImage, RgbImage};

/// Channel order of the raw pixels a source hands us.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

/// A decoded raster image from an upload or a camera, plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbImage,
    order: ChannelOrder,
    source: Option<String>,
}

impl Frame {
    #[must_use]
    pub fn new(image: RgbImage, order: ChannelOrder) -> Self {
        Self {
            image,
            order,
            source: None,
        }
    }

    #[must_use]
    pub fn rgb(image: RgbImage) -> Self {
        Self::new(image, ChannelOrder::Rgb)
    }

    #[must_use]
    pub fn bgr(image: RgbImage) -> Self {
        Self::new(image, ChannelOrder::Bgr)
    }

    /// Decode any supported image into an RGB frame.
    #[must_use]
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self::rgb(image.to_rgb8())
    }

    /// Tag the frame with its origin (upload file name, camera frame name).
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    #[must_use]
    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Raw pixels in the source channel order.
    #[must_use]
    pub fn raw(&self) -> &RgbImage {
        &self.image
    }

    /// Pixels in RGB order; BGR frames are swapped into a new buffer.
    #[must_use]
    pub fn normalized(&self) -> Cow<'_, RgbImage> {
        match self.order {
            ChannelOrder::Rgb => Cow::Borrowed(&self.image),
            ChannelOrder::Bgr => {
                let mut swapped = self.image.clone();
                for pixel in swapped.pixels_mut() {
                    pixel.0.swap(0, 2);
                }
                Cow::Owned(swapped)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn rgb_frames_are_borrowed_unchanged() {
        let image = RgbImage::from_pixel(2, 2, Rgb([10, 20, 30]));
        let frame = Frame::rgb(image);
        let normalized = frame.normalized();
        assert!(matches!(normalized, Cow::Borrowed(_)));
        assert_eq!(normalized.get_pixel(1, 1), &Rgb([10, 20, 30]));
    }

    #[test]
    fn bgr_frames_are_swapped() {
        let image = RgbImage::from_pixel(3, 1, Rgb([10, 20, 30]));
        let frame = Frame::bgr(image).with_source("camera-0");
        assert_eq!(frame.normalized().get_pixel(2, 0), &Rgb([30, 20, 10]));
        assert_eq!(frame.raw().get_pixel(2, 0), &Rgb([10, 20, 30]));
        assert_eq!(frame.source(), Some("camera-0"));
    }
}
