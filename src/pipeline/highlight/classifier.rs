use image::{Rgb, RgbImage};
use tokio_util::sync::CancellationToken;

use crate::common::color::distance_sq;
use crate::error::HighlightError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Match,
    NonMatch,
}

/// Euclidean distance between two colors in RGB space.
pub fn color_distance(a: Rgb<u8>, b: Rgb<u8>) -> f32 {
    (distance_sq(a.0, b.0) as f32).sqrt()
}

/// Classifies pixels against a target color under a distance tolerance.
///
/// The comparison runs on squared distances so a pixel sitting exactly at
/// `tolerance` is always a match.
#[derive(Debug, Clone, Copy)]
pub struct ColorMatcher {
    target: Rgb<u8>,
    tolerance: f32,
    tolerance_sq: f64,
}

impl ColorMatcher {
    pub fn new(target: Rgb<u8>, tolerance: f32) -> Self {
        let tolerance = tolerance.max(0.0);
        Self {
            target,
            tolerance,
            tolerance_sq: (tolerance as f64) * (tolerance as f64),
        }
    }

    pub fn target(&self) -> Rgb<u8> {
        self.target
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    #[inline]
    pub fn classify(&self, pixel: &Rgb<u8>) -> Classification {
        if distance_sq(pixel.0, self.target.0) as f64 <= self.tolerance_sq {
            Classification::Match
        } else {
            Classification::NonMatch
        }
    }

    pub fn classify_image(&self, image: &RgbImage) -> ColorMask {
        let mut classes = Vec::with_capacity(image.len() / 3);
        let mut matched = 0usize;
        for pixel in image.pixels() {
            let class = self.classify(pixel);
            if class == Classification::Match {
                matched += 1;
            }
            classes.push(class);
        }
        ColorMask {
            width: image.width(),
            height: image.height(),
            classes,
            matched,
        }
    }

    /// Same as [`classify_image`](Self::classify_image) but gives up at the
    /// next row boundary once `cancel` fires.
    pub fn classify_image_cancellable(
        &self,
        image: &RgbImage,
        cancel: &CancellationToken,
    ) -> Result<ColorMask, HighlightError> {
        let (width, height) = image.dimensions();
        let mut classes = Vec::with_capacity(width as usize * height as usize);
        let mut matched = 0usize;

        for row in image.rows() {
            if cancel.is_cancelled() {
                return Err(HighlightError::Cancelled);
            }
            for pixel in row {
                let class = self.classify(pixel);
                if class == Classification::Match {
                    matched += 1;
                }
                classes.push(class);
            }
        }

        Ok(ColorMask {
            width,
            height,
            classes,
            matched,
        })
    }
}

/// Per-pixel match result, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorMask {
    width: u32,
    height: u32,
    classes: Vec<Classification>,
    matched: usize,
}

impl ColorMask {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Classification> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.classes
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn classes(&self) -> &[Classification] {
        &self.classes
    }

    pub fn matched_pixels(&self) -> usize {
        self.matched
    }

    pub fn total_pixels(&self) -> usize {
        self.classes.len()
    }

    /// Fraction of pixels classified as a match, in `[0, 1]`.
    pub fn coverage(&self) -> f32 {
        if self.classes.is_empty() {
            0.0
        } else {
            self.matched as f32 / self.classes.len() as f32
        }
    }
}
