use image::DynamicImage;
use serde::Serialize;
use futures::future::BoxFuture;
use futures::task::{Context, Poll};
use std::sync::Arc;
use tower::Service;

use super::config::AnalysisConfig;
use super::histogram::Histogram;
use super::palette::PaletteExtractor;
use super::quality::{QualityAssessment, QualityAssessor};
use crate::common::DominantColor;
use crate::error::AppError;

/// Everything the media viewer shows next to a photo.
#[derive(Debug, Clone, Serialize)]
pub struct PhotoAnalysis {
    pub width: u32,
    pub height: u32,
    pub histogram: Histogram,
    pub palette: Vec<DominantColor>,
    pub quality: QualityAssessment,
}

pub struct PhotoAnalyzer {
    palette: PaletteExtractor,
    quality: QualityAssessor,
}

impl PhotoAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            palette: PaletteExtractor::new(config.palette),
            quality: QualityAssessor::new(config.quality),
        }
    }

    pub fn analyze(&self, image: &DynamicImage) -> PhotoAnalysis {
        let rgb_image = image.to_rgb8();

        let histogram = Histogram::compute(&rgb_image);
        let palette = self.palette.extract(&rgb_image);
        let quality = self.quality.assess(image);

        PhotoAnalysis {
            width: image.width(),
            height: image.height(),
            histogram,
            palette,
            quality,
        }
    }

    pub fn palette(&self, image: &DynamicImage) -> Vec<DominantColor> {
        self.palette.extract(&image.to_rgb8())
    }
}

impl Default for PhotoAnalyzer {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

#[derive(Clone)]
pub struct AnalysisService {
    analyzer: Arc<PhotoAnalyzer>,
}

impl AnalysisService {
    pub fn new(analyzer: PhotoAnalyzer) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
        }
    }
}

impl Service<Arc<DynamicImage>> for AnalysisService {
    type Response = PhotoAnalysis;
    type Error = AppError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), AppError>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, image: Arc<DynamicImage>) -> Self::Future {
        let analyzer = self.analyzer.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || analyzer.analyze(&image))
                .await
                .map_err(|e| AppError::Analysis(e.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use tower::ServiceExt;

    fn split_image() -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_fn(40, 20, |x, _| {
            if x < 30 { Rgb([20, 40, 200]) } else { Rgb([240, 240, 240]) }
        }))
    }

    #[test]
    fn test_analyze_bundles_everything() {
        let analysis = PhotoAnalyzer::default().analyze(&split_image());
        assert_eq!((analysis.width, analysis.height), (40, 20));
        assert_eq!(analysis.histogram.total, 800);
        assert_eq!(analysis.palette[0].rgb, [20, 40, 200]);
        assert_eq!(analysis.palette[0].name.as_deref(), Some("Blue"));
        assert_eq!(analysis.quality.analyzed_width, 40);
    }

    #[test]
    fn test_unvalidated_palette_config_does_not_panic() {
        let mut config = AnalysisConfig::default();
        config.palette.quantize_levels = 512;
        assert!(config.validate().is_err());
        let palette = PhotoAnalyzer::new(config).palette(&split_image());
        assert_eq!(palette[0].rgb, [20, 40, 200]);
    }

    #[tokio::test]
    async fn test_analysis_service() {
        let service = AnalysisService::new(PhotoAnalyzer::new(AnalysisConfig::fast()));
        let analysis = service.oneshot(Arc::new(split_image())).await.unwrap();
        assert!(!analysis.palette.is_empty());
        assert!(analysis.palette.len() <= 5);
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["histogram"]["total"], 800);
    }
}
