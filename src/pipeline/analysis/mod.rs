pub mod analyzer;
pub mod config;
pub mod histogram;
pub mod palette;
pub mod quality;

pub use analyzer::{AnalysisService, PhotoAnalysis, PhotoAnalyzer};
pub use config::{AnalysisConfig, PaletteConfig, QualityConfig, QualityWeights};
pub use histogram::{Channel, Histogram};
pub use palette::PaletteExtractor;
pub use quality::{Metric, QualityAssessment, QualityAssessor, QualityIssue, QualityRating};
