pub mod color;
pub mod source;

pub use color::{DominantColor, ParseColorError};
pub use source::{FsImageLoader, ImageLoader, ImageSource};
