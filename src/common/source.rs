use async_trait::async_trait;
use image::DynamicImage;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::LoadError;

/// Where the photo being highlighted comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Path(PathBuf),
    /// A URL. Only `file://` is understood by [`FsImageLoader`]; anything
    /// else needs a loader supplied by the caller.
    Url(String),
    /// Encoded bytes (PNG, JPEG, ...) already in memory.
    Bytes(Arc<[u8]>),
    Decoded(Arc<DynamicImage>),
}

impl ImageSource {
    pub fn describe(&self) -> String {
        match self {
            ImageSource::Path(path) => path.display().to_string(),
            ImageSource::Url(url) => url.clone(),
            ImageSource::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
            ImageSource::Decoded(image) => {
                format!("<decoded {}x{}>", image.width(), image.height())
            }
        }
    }
}

impl From<DynamicImage> for ImageSource {
    fn from(image: DynamicImage) -> Self {
        ImageSource::Decoded(Arc::new(image))
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

/// Turns an [`ImageSource`] into a decoded image.
///
/// Fetching from a remote content API is the caller's business: implement
/// this trait around whatever client the application already holds and pass
/// it to the highlighter.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load(&self, source: &ImageSource) -> Result<DynamicImage, LoadError>;
}

/// Loads from the local filesystem and from in-memory sources.
#[derive(Debug, Default, Clone)]
pub struct FsImageLoader;

impl FsImageLoader {
    pub fn new() -> Self {
        Self
    }

    async fn read(path: PathBuf) -> Result<Vec<u8>, LoadError> {
        tokio::fs::read(&path).await.map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

pub fn decode(bytes: &[u8]) -> Result<DynamicImage, LoadError> {
    Ok(image::load_from_memory(bytes)?)
}

#[async_trait]
impl ImageLoader for FsImageLoader {
    async fn load(&self, source: &ImageSource) -> Result<DynamicImage, LoadError> {
        match source {
            ImageSource::Decoded(image) => Ok(image.as_ref().clone()),
            ImageSource::Bytes(bytes) => decode(bytes),
            ImageSource::Path(path) => {
                let bytes = Self::read(path.clone()).await?;
                decode(&bytes)
            }
            ImageSource::Url(url) => match url.strip_prefix("file://") {
                Some(path) => {
                    let bytes = Self::read(PathBuf::from(path)).await?;
                    decode(&bytes)
                }
                None => Err(LoadError::UnsupportedScheme(url.clone())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgb};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(
            4,
            3,
            Rgb([9, 8, 7]),
        ));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[tokio::test]
    async fn test_loads_encoded_bytes() {
        let loader = FsImageLoader::new();
        let source = ImageSource::Bytes(Arc::from(png_bytes()));
        let image = loader.load(&source).await.unwrap();
        assert_eq!((image.width(), image.height()), (4, 3));
        assert_eq!(image.to_rgb8().get_pixel(2, 1), &Rgb([9, 8, 7]));
    }

    #[tokio::test]
    async fn test_loads_file_url() {
        let path = std::env::temp_dir().join(format!("colorspot-{}.png", uuid::Uuid::new_v4()));
        std::fs::write(&path, png_bytes()).unwrap();

        let loader = FsImageLoader::new();
        let url = format!("file://{}", path.display());
        let image = loader.load(&ImageSource::Url(url)).await.unwrap();
        assert_eq!(image.width(), 4);

        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_rejects_remote_url() {
        let loader = FsImageLoader::new();
        let result = loader
            .load(&ImageSource::Url("https://cms.example/assets/1".to_string()))
            .await;
        assert!(matches!(result, Err(LoadError::UnsupportedScheme(_))));
    }

    #[tokio::test]
    async fn test_garbage_bytes_fail_to_decode() {
        let loader = FsImageLoader::new();
        let result = loader
            .load(&ImageSource::Bytes(Arc::from(vec![1u8, 2, 3, 4])))
            .await;
        assert!(matches!(result, Err(LoadError::Decode(_))));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let loader = FsImageLoader::new();
        let result = loader
            .load(&ImageSource::Path(PathBuf::from("/nonexistent/colorspot.png")))
            .await;
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }
}
