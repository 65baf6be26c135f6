pub mod analysis;
pub mod highlight;
pub mod timing;

pub use analysis::{AnalysisService, PhotoAnalysis, PhotoAnalyzer};
pub use highlight::{ColorHighlighter, HighlightOutcome, HighlightRequest, HighlightService};
pub use timing::TimingLayer;
