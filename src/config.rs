use config::{Config, Environment, File};
use image::imageops::FilterType;
use serde::Deserialize;
use std::path::Path;

use crate::error::SettingsError;
use crate::pipeline::analysis::AnalysisConfig;

const ENV_PREFIX: &str = "COLORSPOT";

/// Top-level settings, loaded from an optional file plus `COLORSPOT__*`
/// environment variables (e.g. `COLORSPOT__HIGHLIGHT__TOLERANCE=32`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub highlight: HighlightConfig,
    pub analysis: AnalysisConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.highlight.validate()?;
        self.analysis.validate()?;
        self.logging.validate()
    }
}

/// Tunables for the color highlight overlay.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Maximum Euclidean RGB distance still counted as a match (inclusive).
    pub tolerance: f32,
    /// Added to every channel of a matched pixel, saturating at 255.
    pub brighten_offset: u8,
    pub match_alpha: u8,
    pub dim_alpha: u8,
    pub resample_filter: ResampleFilter,
    pub border: BorderStyle,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            tolerance: 40.0,
            brighten_offset: 50,
            match_alpha: 200,
            dim_alpha: 140,
            resample_filter: ResampleFilter::Bilinear,
            border: BorderStyle::default(),
        }
    }
}

impl HighlightConfig {
    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_brighten_offset(mut self, offset: u8) -> Self {
        self.brighten_offset = offset;
        self
    }

    pub fn with_resample_filter(mut self, filter: ResampleFilter) -> Self {
        self.resample_filter = filter;
        self
    }

    pub fn with_border(mut self, border: BorderStyle) -> Self {
        self.border = border;
        self
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(SettingsError::Invalid {
                field: "highlight.tolerance",
                reason: format!("must be a finite value >= 0, got {}", self.tolerance),
            });
        }
        if self.border.glow_alpha < 0.0 || self.border.glow_alpha > 1.0 {
            return Err(SettingsError::Invalid {
                field: "highlight.border.glow_alpha",
                reason: format!("must be between 0.0 and 1.0, got {}", self.border.glow_alpha),
            });
        }
        Ok(())
    }
}

/// The frame stroked around the overlay.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BorderStyle {
    pub enabled: bool,
    /// Distance of the stroke's center line from the canvas edge.
    pub inset: u32,
    pub width: u32,
    pub color: [u8; 3],
    /// How far the glow (drawn in the target color) reaches past the stroke.
    pub glow_radius: u32,
    pub glow_alpha: f32,
}

impl Default for BorderStyle {
    fn default() -> Self {
        Self {
            enabled: true,
            inset: 1,
            width: 3,
            color: [255, 255, 255],
            glow_radius: 8,
            glow_alpha: 0.6,
        }
    }
}

impl BorderStyle {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleFilter {
    Nearest,
    Bilinear,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResampleFilter> for FilterType {
    fn from(filter: ResampleFilter) -> Self {
        match filter {
            ResampleFilter::Nearest => FilterType::Nearest,
            ResampleFilter::Bilinear => FilterType::Triangle,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Gaussian => FilterType::Gaussian,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn level(&self) -> Result<tracing::Level, SettingsError> {
        self.level
            .parse::<tracing::Level>()
            .map_err(|e| SettingsError::Invalid {
                field: "logging.level",
                reason: e.to_string(),
            })
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.level().map(|_| ())
    }
}
