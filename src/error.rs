use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Highlight Error: {0}")]
    Highlight(#[from] HighlightError),
    #[error("Load Error: {0}")]
    Load(#[from] LoadError),
    #[error("Surface Error: {0}")]
    Surface(#[from] SurfaceError),
    #[error("Settings Error: {0}")]
    Settings(#[from] SettingsError),
    #[error("Analysis Error: {0}")]
    Analysis(String),
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Nothing was drawn: {0}")]
    NothingDrawn(String),
}

// Image source errors
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read image from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Unsupported URL scheme in {0}")]
    UnsupportedScheme(String),
    /// For `ImageLoader` implementations supplied by the caller.
    #[error("Image loader failed: {0}")]
    Loader(String),
}

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("The drawing surface is not mounted.")]
    Unmounted,
    #[error("Layer is {layer_width}x{layer_height} but the surface is {surface_width}x{surface_height}")]
    SizeMismatch {
        layer_width: u32,
        layer_height: u32,
        surface_width: u32,
        surface_height: u32,
    },
    #[error("The drawing surface lock was poisoned.")]
    Poisoned,
    #[error("Failed to save surface: {0}")]
    Save(#[from] image::ImageError),
}

#[derive(Error, Debug)]
pub enum HighlightError {
    #[error("Output dimensions must be non-zero, got {0}x{1}")]
    InvalidDimensions(u32, u32),
    #[error("Superseded by a newer request")]
    Cancelled,
    #[error("Failed to load source image: {0}")]
    Load(#[from] LoadError),
    #[error("Failed to draw overlay: {0}")]
    Surface(#[from] SurfaceError),
    #[error("Rendering task failed: {0}")]
    Task(String),
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
