use image::imageops::FilterType;
use image::DynamicImage;
use serde::Serialize;

use super::config::QualityConfig;
use super::histogram::{Channel, Histogram};
use crate::common::color::rgb_to_luma;

// Raw metric values at which a score reaches ~63% of its range.
const SHARPNESS_SCALE: f32 = 300.0;
const FOCUS_SCALE: f32 = 2000.0;
const NOISE_SCALE: f32 = 8.0;
// Luminance standard deviation treated as full contrast.
const FULL_CONTRAST_STD: f32 = 64.0;

/// A raw measurement and its 0-100 score (higher is better).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metric {
    pub value: f32,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QualityRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityRating {
    pub fn from_score(score: f32) -> Self {
        if score >= 85.0 {
            QualityRating::Excellent
        } else if score >= 70.0 {
            QualityRating::Good
        } else if score >= 50.0 {
            QualityRating::Fair
        } else {
            QualityRating::Poor
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QualityIssue {
    Blurry,
    Noisy,
    LowDynamicRange,
    OutOfFocus,
    LowContrast,
}

impl QualityIssue {
    pub fn advice(&self) -> &'static str {
        match self {
            QualityIssue::Blurry => "Image lacks fine detail; check shutter speed or stabilization",
            QualityIssue::Noisy => "Visible noise; lower the ISO or apply noise reduction",
            QualityIssue::LowDynamicRange => "Tones are compressed; check exposure or expand levels",
            QualityIssue::OutOfFocus => "The center of the frame is soft; check focus point",
            QualityIssue::LowContrast => "Flat tonality; add contrast or a tone curve",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityAssessment {
    /// Variance of the Laplacian.
    pub sharpness: Metric,
    /// Estimated noise standard deviation in luminance levels.
    pub noise: Metric,
    /// Spread between the 1st and 99th luminance percentiles.
    pub dynamic_range: Metric,
    pub dynamic_range_stops: f32,
    /// Tenengrad energy of the central third.
    pub focus: Metric,
    /// RMS contrast (luminance standard deviation).
    pub contrast: Metric,
    pub overall: f32,
    pub rating: QualityRating,
    pub issues: Vec<QualityIssue>,
    pub analyzed_width: u32,
    pub analyzed_height: u32,
}

/// Row-major luminance plane.
struct LumaPlane {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl LumaPlane {
    fn from_image(image: &DynamicImage) -> Self {
        let rgb = image.to_rgb8();
        let data = rgb.pixels().map(|p| rgb_to_luma(p[0], p[1], p[2])).collect();
        Self {
            width: rgb.width() as usize,
            height: rgb.height() as usize,
            data,
        }
    }

    #[inline]
    fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    /// 3x3 kernel response at an interior pixel.
    #[inline]
    fn convolve(&self, x: usize, y: usize, kernel: &[[f32; 3]; 3]) -> f32 {
        let mut acc = 0.0;
        for (ky, row) in kernel.iter().enumerate() {
            for (kx, k) in row.iter().enumerate() {
                acc += k * self.at(x + kx - 1, y + ky - 1);
            }
        }
        acc
    }
}

/// Welford running mean/variance.
#[derive(Default)]
struct RunningStats {
    n: f64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    fn push(&mut self, v: f32) {
        let v = v as f64;
        self.n += 1.0;
        let delta = v - self.mean;
        self.mean += delta / self.n;
        self.m2 += delta * (v - self.mean);
    }

    fn variance(&self) -> f32 {
        if self.n < 2.0 {
            0.0
        } else {
            (self.m2 / self.n) as f32
        }
    }
}

const LAPLACIAN: [[f32; 3]; 3] = [[0.0, 1.0, 0.0], [1.0, -4.0, 1.0], [0.0, 1.0, 0.0]];
const NOISE_KERNEL: [[f32; 3]; 3] = [[1.0, -2.0, 1.0], [-2.0, 4.0, -2.0], [1.0, -2.0, 1.0]];
const SOBEL_X: [[f32; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_Y: [[f32; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

fn saturating_score(value: f32, scale: f32) -> f32 {
    100.0 * (1.0 - (-value / scale).exp())
}

fn laplacian_variance(plane: &LumaPlane) -> f32 {
    if plane.width < 3 || plane.height < 3 {
        return 0.0;
    }
    let mut stats = RunningStats::default();
    for y in 1..plane.height - 1 {
        for x in 1..plane.width - 1 {
            stats.push(plane.convolve(x, y, &LAPLACIAN));
        }
    }
    stats.variance()
}

/// Immerkaer's fast noise variance estimate.
fn noise_sigma(plane: &LumaPlane) -> f32 {
    if plane.width < 3 || plane.height < 3 {
        return 0.0;
    }
    let mut sum = 0.0f64;
    for y in 1..plane.height - 1 {
        for x in 1..plane.width - 1 {
            sum += plane.convolve(x, y, &NOISE_KERNEL).abs() as f64;
        }
    }
    let interior = ((plane.width - 2) * (plane.height - 2)) as f64;
    ((std::f64::consts::PI / 2.0).sqrt() * sum / (6.0 * interior)) as f32
}

/// Mean squared Sobel gradient over the central third of the frame.
fn center_tenengrad(plane: &LumaPlane) -> f32 {
    if plane.width < 3 || plane.height < 3 {
        return 0.0;
    }
    let x0 = (plane.width / 3).max(1);
    let x1 = (plane.width - plane.width / 3).min(plane.width - 1);
    let y0 = (plane.height / 3).max(1);
    let y1 = (plane.height - plane.height / 3).min(plane.height - 1);

    let mut sum = 0.0f64;
    let mut n = 0u64;
    for y in y0..y1 {
        for x in x0..x1 {
            let gx = plane.convolve(x, y, &SOBEL_X);
            let gy = plane.convolve(x, y, &SOBEL_Y);
            sum += (gx * gx + gy * gy) as f64;
            n += 1;
        }
    }
    if n == 0 {
        0.0
    } else {
        (sum / n as f64) as f32
    }
}

/// Scores a photo on sharpness, noise, dynamic range, focus and contrast.
pub struct QualityAssessor {
    config: QualityConfig,
}

impl QualityAssessor {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    pub fn assess(&self, image: &DynamicImage) -> QualityAssessment {
        let max = self.config.max_dimension.max(1);
        let working = if image.width() > max || image.height() > max {
            image.resize(max, max, FilterType::Triangle)
        } else {
            image.clone()
        };
        let plane = LumaPlane::from_image(&working);

        let lap_var = laplacian_variance(&plane);
        let sharpness = Metric {
            value: lap_var,
            score: saturating_score(lap_var, SHARPNESS_SCALE),
        };

        let sigma = noise_sigma(&plane);
        let noise = Metric {
            value: sigma,
            score: 100.0 * (-sigma / NOISE_SCALE).exp(),
        };

        let histogram = Histogram::compute(&working.to_rgb8());
        let low = histogram.percentile(Channel::Luminance, 1.0);
        let high = histogram.percentile(Channel::Luminance, 99.0);
        let spread = high.saturating_sub(low) as f32;
        let dynamic_range = Metric {
            value: spread,
            score: spread / 255.0 * 100.0,
        };
        let dynamic_range_stops = ((high as f32 + 1.0) / (low as f32 + 1.0)).log2();

        let tenengrad = center_tenengrad(&plane);
        let focus = Metric {
            value: tenengrad,
            score: saturating_score(tenengrad, FOCUS_SCALE),
        };

        let mut stats = RunningStats::default();
        plane.data.iter().for_each(|v| stats.push(*v));
        let std_dev = stats.variance().sqrt();
        let contrast = Metric {
            value: std_dev,
            score: (std_dev / FULL_CONTRAST_STD * 100.0).min(100.0),
        };

        let w = &self.config.weights;
        let total_weight = w.total();
        let overall = if total_weight > 0.0 {
            (sharpness.score * w.sharpness
                + noise.score * w.noise
                + dynamic_range.score * w.dynamic_range
                + focus.score * w.focus
                + contrast.score * w.contrast)
                / total_weight
        } else {
            0.0
        };

        let threshold = self.config.issue_threshold;
        let issues = [
            (sharpness, QualityIssue::Blurry),
            (noise, QualityIssue::Noisy),
            (dynamic_range, QualityIssue::LowDynamicRange),
            (focus, QualityIssue::OutOfFocus),
            (contrast, QualityIssue::LowContrast),
        ]
        .into_iter()
        .filter(|(metric, _)| metric.score < threshold)
        .map(|(_, issue)| issue)
        .collect();

        QualityAssessment {
            sharpness,
            noise,
            dynamic_range,
            dynamic_range_stops,
            focus,
            contrast,
            overall,
            rating: QualityRating::from_score(overall),
            issues,
            analyzed_width: working.width(),
            analyzed_height: working.height(),
        }
    }
}

impl Default for QualityAssessor {
    fn default() -> Self {
        Self::new(QualityConfig::default())
    }
}
