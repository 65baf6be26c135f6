use futures::future::BoxFuture;
use futures::task::{Context, Poll};
use std::sync::Arc;

use tower::Service;

use super::highlighter::{ColorHighlighter, HighlightOutcome, HighlightRequest};
use super::surface::{SharedSurface, Surface};
use crate::error::AppError;

/// Exposes a [`ColorHighlighter`] bound to one surface as a tower service.
pub struct HighlightService<S> {
    highlighter: Arc<ColorHighlighter>,
    surface: SharedSurface<S>,
}

impl<S> HighlightService<S> {
    pub fn new(highlighter: Arc<ColorHighlighter>, surface: SharedSurface<S>) -> Self {
        Self {
            highlighter,
            surface,
        }
    }

    pub fn surface(&self) -> &SharedSurface<S> {
        &self.surface
    }
}

impl<S> Clone for HighlightService<S> {
    fn clone(&self) -> Self {
        Self {
            highlighter: self.highlighter.clone(),
            surface: self.surface.clone(),
        }
    }
}

impl<S> Service<HighlightRequest> for HighlightService<S>
where
    S: Surface + 'static,
{
    type Response = HighlightOutcome;
    type Error = AppError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), AppError>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: HighlightRequest) -> Self::Future {
        let highlighter = self.highlighter.clone();
        let surface = self.surface.clone();
        Box::pin(async move { Ok(highlighter.highlight(request, &surface).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{DominantColor, FsImageLoader, ImageSource};
    use crate::config::HighlightConfig;
    use crate::pipeline::highlight::surface::{shared, Canvas};
    use crate::pipeline::timing::TimingLayer;
    use image::{DynamicImage, Rgb, RgbImage};
    use tower::{ServiceBuilder, ServiceExt};

    #[tokio::test]
    async fn test_highlight_service() {
        let highlighter = Arc::new(ColorHighlighter::new(
            Arc::new(FsImageLoader::new()),
            HighlightConfig::default(),
        ));
        let canvas = shared(Canvas::new(16, 16));
        let service = ServiceBuilder::new()
            .layer(TimingLayer::new("highlight"))
            .service(HighlightService::new(highlighter, canvas.clone()));

        let source = ImageSource::from(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            32,
            32,
            Rgb([0, 200, 0]),
        )));
        let request = HighlightRequest::new(source, DominantColor::new([0, 190, 10]), 16, 16);
        let outcome = service.oneshot(request).await.unwrap();

        assert_eq!(outcome.report().unwrap().matched_pixels, 256);
        assert!(!canvas.lock().unwrap().is_blank());
    }
}
