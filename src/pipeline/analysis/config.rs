use serde::Deserialize;

use crate::error::SettingsError;

/// Configuration for photo analysis with tunable parameters
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub palette: PaletteConfig,
    pub quality: QualityConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PaletteConfig {
    /// Only every `sample_step`-th pixel in each direction is counted.
    pub sample_step: u32,
    /// Levels per channel after quantization. Must divide 256 evenly.
    pub quantize_levels: u32,
    pub max_colors: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Larger images are downscaled so their longest side fits.
    pub max_dimension: u32,
    /// Metric scores below this are reported as issues.
    pub issue_threshold: f32,
    pub weights: QualityWeights,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
    pub sharpness: f32,
    pub noise: f32,
    pub dynamic_range: f32,
    pub focus: f32,
    pub contrast: f32,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            sample_step: 4,
            quantize_levels: 16,
            max_colors: 5,
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            max_dimension: 1024,
            issue_threshold: 50.0,
            weights: QualityWeights::default(),
        }
    }
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            sharpness: 0.3,
            noise: 0.2,
            dynamic_range: 0.2,
            focus: 0.15,
            contrast: 0.15,
        }
    }
}

impl QualityWeights {
    pub fn total(&self) -> f32 {
        self.sharpness + self.noise + self.dynamic_range + self.focus + self.contrast
    }
}

impl AnalysisConfig {
    /// Coarse sampling for thumbnails and quick previews
    pub fn fast() -> Self {
        Self {
            palette: PaletteConfig {
                sample_step: 8,
                quantize_levels: 8,
                max_colors: 5,
            },
            quality: QualityConfig {
                max_dimension: 512,
                ..QualityConfig::default()
            },
        }
    }

    /// Every pixel, finer bins, full-size quality metrics
    pub fn thorough() -> Self {
        Self {
            palette: PaletteConfig {
                sample_step: 1,
                quantize_levels: 32,
                max_colors: 8,
            },
            quality: QualityConfig {
                max_dimension: 2048,
                ..QualityConfig::default()
            },
        }
    }

    pub fn with_max_colors(mut self, max_colors: usize) -> Self {
        self.palette.max_colors = max_colors;
        self
    }

    pub fn with_sample_step(mut self, step: u32) -> Self {
        self.palette.sample_step = step;
        self
    }

    pub fn with_issue_threshold(mut self, threshold: f32) -> Self {
        self.quality.issue_threshold = threshold.clamp(0.0, 100.0);
        self
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), SettingsError> {
        let palette = &self.palette;
        if palette.sample_step == 0 {
            return Err(SettingsError::Invalid {
                field: "analysis.palette.sample_step",
                reason: "must be greater than 0".to_string(),
            });
        }
        if !(2..=256).contains(&palette.quantize_levels) || 256 % palette.quantize_levels != 0 {
            return Err(SettingsError::Invalid {
                field: "analysis.palette.quantize_levels",
                reason: format!(
                    "must divide 256 and be at least 2, got {}",
                    palette.quantize_levels
                ),
            });
        }
        if palette.max_colors == 0 {
            return Err(SettingsError::Invalid {
                field: "analysis.palette.max_colors",
                reason: "at least one color must be reported".to_string(),
            });
        }

        let quality = &self.quality;
        if quality.max_dimension < 16 {
            return Err(SettingsError::Invalid {
                field: "analysis.quality.max_dimension",
                reason: format!("must be at least 16, got {}", quality.max_dimension),
            });
        }
        let w = &quality.weights;
        let weights = [w.sharpness, w.noise, w.dynamic_range, w.focus, w.contrast];
        if weights.iter().any(|v| *v < 0.0 || !v.is_finite()) || w.total() <= 0.0 {
            return Err(SettingsError::Invalid {
                field: "analysis.quality.weights",
                reason: "weights must be non-negative with a positive sum".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
        assert!(AnalysisConfig::fast().validate().is_ok());
        assert!(AnalysisConfig::thorough().validate().is_ok());
    }

    #[test]
    fn test_rejects_uneven_quantization() {
        let mut config = AnalysisConfig::default();
        config.palette.quantize_levels = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_sample_step() {
        assert!(AnalysisConfig::default().with_sample_step(0).validate().is_err());
    }

    #[test]
    fn test_rejects_all_zero_weights() {
        let mut config = AnalysisConfig::default();
        config.quality.weights = QualityWeights {
            sharpness: 0.0,
            noise: 0.0,
            dynamic_range: 0.0,
            focus: 0.0,
            contrast: 0.0,
        };
        assert!(config.validate().is_err());
    }
}
