use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use tokio_util::sync::CancellationToken;

use super::classifier::{Classification, ColorMask, ColorMatcher};
use crate::config::{BorderStyle, HighlightConfig};
use crate::error::HighlightError;

/// Everything produced for one highlight, ready to composite.
#[derive(Debug, Clone)]
pub struct OverlayFrame {
    pub mask: ColorMask,
    pub mask_layer: RgbaImage,
    pub border_layer: Option<RgbaImage>,
}

impl OverlayFrame {
    pub fn dimensions(&self) -> (u32, u32) {
        self.mask_layer.dimensions()
    }
}

/// Resize the source to the on-screen size so the mask lines up with the
/// displayed photo pixel for pixel.
pub fn resample(image: &DynamicImage, width: u32, height: u32, filter: FilterType) -> RgbImage {
    let rgb = image.to_rgb8();
    if rgb.dimensions() == (width, height) {
        return rgb;
    }
    imageops::resize(&rgb, width, height, filter)
}

pub fn render_mask_layer(resampled: &RgbImage, mask: &ColorMask, config: &HighlightConfig) -> RgbaImage {
    let offset = config.brighten_offset;
    let mut layer = RgbaImage::new(resampled.width(), resampled.height());
    for ((src, class), dst) in resampled
        .pixels()
        .zip(mask.classes())
        .zip(layer.pixels_mut())
    {
        *dst = match class {
            Classification::Match => Rgba([
                src[0].saturating_add(offset),
                src[1].saturating_add(offset),
                src[2].saturating_add(offset),
                config.match_alpha,
            ]),
            Classification::NonMatch => Rgba([0, 0, 0, config.dim_alpha]),
        };
    }
    layer
}

/// Distance from a point to the outline of the rectangle `[x0, x1] x [y0, y1]`.
fn distance_to_outline(px: f32, py: f32, x0: f32, y0: f32, x1: f32, y1: f32) -> f32 {
    let inside = px >= x0 && px <= x1 && py >= y0 && py <= y1;
    if inside {
        (px - x0).min(x1 - px).min(py - y0).min(y1 - py)
    } else {
        let dx = (x0 - px).max(0.0).max(px - x1);
        let dy = (y0 - py).max(0.0).max(py - y1);
        (dx * dx + dy * dy).sqrt()
    }
}

/// A rectangular stroke around the whole canvas with a soft glow in `glow`.
pub fn render_border_layer(width: u32, height: u32, glow: Rgb<u8>, border: &BorderStyle) -> RgbaImage {
    let mut layer = RgbaImage::new(width, height);
    if width == 0 || height == 0 {
        return layer;
    }

    let inset = border.inset as f32;
    let (x0, y0) = (inset, inset);
    let x1 = (width as f32 - inset).max(x0);
    let y1 = (height as f32 - inset).max(y0);
    let half = border.width as f32 / 2.0;
    let reach = half + border.glow_radius as f32;
    let stroke = Rgba([border.color[0], border.color[1], border.color[2], 255]);

    for (x, y, px) in layer.enumerate_pixels_mut() {
        // sample at the pixel center
        let d = distance_to_outline(x as f32 + 0.5, y as f32 + 0.5, x0, y0, x1, y1);
        if d <= half {
            *px = stroke;
        } else if d <= reach && border.glow_radius > 0 {
            let falloff = 1.0 - (d - half) / border.glow_radius as f32;
            let alpha = (border.glow_alpha * falloff * falloff * 255.0).round() as u8;
            if alpha > 0 {
                *px = Rgba([glow[0], glow[1], glow[2], alpha]);
            }
        }
    }
    layer
}

/// Classify the resampled image and render both overlay layers.
pub fn render_overlay(
    resampled: &RgbImage,
    matcher: &ColorMatcher,
    config: &HighlightConfig,
    cancel: &CancellationToken,
) -> Result<OverlayFrame, HighlightError> {
    let mask = matcher.classify_image_cancellable(resampled, cancel)?;
    let mask_layer = render_mask_layer(resampled, &mask, config);
    let border_layer = config.border.enabled.then(|| {
        render_border_layer(
            resampled.width(),
            resampled.height(),
            matcher.target(),
            &config.border,
        )
    });
    Ok(OverlayFrame {
        mask,
        mask_layer,
        border_layer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageBuffer;

    fn no_border() -> HighlightConfig {
        HighlightConfig::default().with_border(BorderStyle::disabled())
    }

    #[test]
    fn test_match_pixel_is_brightened_and_clamped() {
        let img = RgbImage::from_pixel(3, 3, Rgb([255, 0, 0]));
        let matcher = ColorMatcher::new(Rgb([255, 0, 0]), 40.0);
        let frame = render_overlay(&img, &matcher, &no_border(), &CancellationToken::new()).unwrap();
        assert_eq!(frame.mask_layer.get_pixel(1, 1), &Rgba([255, 50, 50, 200]));
        assert!(frame.border_layer.is_none());
    }

    #[test]
    fn test_non_match_pixel_is_dimmed() {
        let img = RgbImage::from_pixel(3, 3, Rgb([255, 255, 255]));
        let matcher = ColorMatcher::new(Rgb([0, 0, 0]), 40.0);
        let frame = render_overlay(&img, &matcher, &no_border(), &CancellationToken::new()).unwrap();
        assert_eq!(frame.mask_layer.get_pixel(2, 0), &Rgba([0, 0, 0, 140]));
        assert_eq!(frame.mask.matched_pixels(), 0);
    }

    #[test]
    fn test_custom_offset_and_alphas() {
        let mut config = no_border().with_brighten_offset(10);
        config.match_alpha = 255;
        config.dim_alpha = 0;
        let img = ImageBuffer::from_fn(2, 1, |x, _| {
            if x == 0 { Rgb([100, 100, 100]) } else { Rgb([0, 0, 0]) }
        });
        let matcher = ColorMatcher::new(Rgb([100, 100, 100]), 5.0);
        let frame = render_overlay(&img, &matcher, &config, &CancellationToken::new()).unwrap();
        assert_eq!(frame.mask_layer.get_pixel(0, 0), &Rgba([110, 110, 110, 255]));
        assert_eq!(frame.mask_layer.get_pixel(1, 0), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_resample_hits_requested_size() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb([5, 6, 7])));
        let out = resample(&img, 8, 6, FilterType::Triangle);
        assert_eq!(out.dimensions(), (8, 6));
        assert_eq!(out.get_pixel(4, 3), &Rgb([5, 6, 7]));
    }

    #[test]
    fn test_border_stroke_and_glow() {
        let border = BorderStyle::default();
        let layer = render_border_layer(64, 48, Rgb([255, 0, 0]), &border);
        // pixel 1 straddles the stroke line at x = 1
        assert_eq!(layer.get_pixel(1, 20), &Rgba([255, 255, 255, 255]));
        // just inside the stroke the glow takes the target color
        let glow = layer.get_pixel(4, 20);
        assert_eq!((glow[0], glow[1], glow[2]), (255, 0, 0));
        assert!(glow[3] > 0 && glow[3] < 255);
        // the center is untouched
        assert_eq!(layer.get_pixel(32, 24), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_glow_fades_with_distance() {
        let layer = render_border_layer(64, 64, Rgb([0, 0, 255]), &BorderStyle::default());
        let near = layer.get_pixel(4, 32)[3];
        let far = layer.get_pixel(8, 32)[3];
        assert!(near > far, "near {} far {}", near, far);
    }
}
