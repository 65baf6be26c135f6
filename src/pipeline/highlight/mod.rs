pub mod classifier;
pub mod highlighter;
pub mod overlay;
pub mod service;
pub mod surface;

pub use classifier::{color_distance, Classification, ColorMask, ColorMatcher};
pub use highlighter::{
    ClearReason, ColorHighlighter, HighlightOutcome, HighlightReport, HighlightRequest,
    HighlightStatus,
};
pub use overlay::{render_border_layer, render_mask_layer, render_overlay, resample, OverlayFrame};
pub use service::HighlightService;
pub use surface::{blend_pixel, shared, BlendMode, Canvas, SharedSurface, Surface};
