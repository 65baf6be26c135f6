pub mod common;
pub mod config;
pub mod error;
pub mod pipeline;

pub use common::{DominantColor, FsImageLoader, ImageLoader, ImageSource};
pub use config::{BorderStyle, HighlightConfig, ResampleFilter, Settings};
pub use error::{AppError, HighlightError, LoadError, SettingsError, SurfaceError};
pub use pipeline::highlight::{
    shared, Canvas, ClearReason, ColorHighlighter, HighlightOutcome, HighlightReport,
    HighlightRequest, HighlightService, HighlightStatus, SharedSurface, Surface,
};
pub use pipeline::analysis::{AnalysisConfig, PhotoAnalysis, PhotoAnalyzer};
