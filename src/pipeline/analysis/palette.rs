use image::{Rgb, RgbImage};
use indexmap::IndexMap;

use super::config::PaletteConfig;
use crate::common::color::{nearest_color_name, DominantColor};

#[derive(Default)]
struct Bin {
    count: u32,
    sum: [u64; 3],
}

/// Extracts the dominant colors of a photo by quantized bin counting.
pub struct PaletteExtractor {
    config: PaletteConfig,
}

impl PaletteExtractor {
    pub fn new(config: PaletteConfig) -> Self {
        Self { config }
    }

    fn quantize(&self, px: &Rgb<u8>) -> (u8, u8, u8) {
        // quantize_levels divides 256, e.g. 16 -> 4 bits per channel
        let step = (256 / self.config.quantize_levels.clamp(2, 256)) as usize;
        let q = |v: u8| ((v as usize / step) * step).min(255) as u8;
        (q(px[0]), q(px[1]), q(px[2]))
    }

    /// Returns the most common colors, most frequent first. Each color is the
    /// mean of the pixels in its bin; `percentage` is its share of the
    /// sampled pixels.
    pub fn extract(&self, image: &RgbImage) -> Vec<DominantColor> {
        let step = self.config.sample_step.max(1) as usize;
        let mut bins: IndexMap<(u8, u8, u8), Bin> = IndexMap::new();
        let mut sampled = 0u64;

        for y in (0..image.height()).step_by(step) {
            for x in (0..image.width()).step_by(step) {
                let px = image.get_pixel(x, y);
                let bin = bins.entry(self.quantize(px)).or_default();
                bin.count += 1;
                for c in 0..3 {
                    bin.sum[c] += px[c] as u64;
                }
                sampled += 1;
            }
        }

        if sampled == 0 {
            return Vec::new();
        }

        let mut sorted: Vec<_> = bins.into_values().collect();
        // stable sort: equal counts keep first-seen order
        sorted.sort_by_key(|bin| std::cmp::Reverse(bin.count));

        sorted
            .into_iter()
            .take(self.config.max_colors)
            .map(|bin| {
                let n = bin.count as u64;
                let rgb = [
                    ((bin.sum[0] + n / 2) / n) as u8,
                    ((bin.sum[1] + n / 2) / n) as u8,
                    ((bin.sum[2] + n / 2) / n) as u8,
                ];
                DominantColor::new(rgb)
                    .with_name(nearest_color_name(rgb))
                    .with_percentage(bin.count as f32 * 100.0 / sampled as f32)
            })
            .collect()
    }
}

impl Default for PaletteExtractor {
    fn default() -> Self {
        Self::new(PaletteConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageBuffer;

    fn every_pixel() -> PaletteConfig {
        PaletteConfig {
            sample_step: 1,
            ..PaletteConfig::default()
        }
    }

    #[test]
    fn test_orders_by_frequency() {
        // 75% red, 25% blue
        let img = ImageBuffer::from_fn(4, 4, |x, _| {
            if x < 3 { Rgb([250, 10, 10]) } else { Rgb([10, 10, 250]) }
        });
        let palette = PaletteExtractor::new(every_pixel()).extract(&img);
        assert_eq!(palette.len(), 2);
        assert_eq!(palette[0].rgb, [250, 10, 10]);
        assert_eq!(palette[0].name.as_deref(), Some("Red"));
        assert_eq!(palette[0].percentage, 75.0);
        assert_eq!(palette[1].hex, "#0a0afa");
        assert_eq!(palette[1].percentage, 25.0);
    }

    #[test]
    fn test_reports_bin_mean() {
        // both shades fall into the same 16-level bin
        let img = ImageBuffer::from_fn(2, 1, |x, _| {
            if x == 0 { Rgb([100, 100, 100]) } else { Rgb([104, 104, 104]) }
        });
        let palette = PaletteExtractor::new(every_pixel()).extract(&img);
        assert_eq!(palette.len(), 1);
        assert_eq!(palette[0].rgb, [102, 102, 102]);
        assert_eq!(palette[0].percentage, 100.0);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let img = ImageBuffer::from_fn(2, 1, |x, _| {
            if x == 0 { Rgb([0, 200, 0]) } else { Rgb([200, 0, 0]) }
        });
        let palette = PaletteExtractor::new(every_pixel()).extract(&img);
        assert_eq!(palette[0].rgb, [0, 200, 0]);
        assert_eq!(palette[1].rgb, [200, 0, 0]);
    }

    #[test]
    fn test_respects_max_colors() {
        let img = ImageBuffer::from_fn(16, 1, |x, _| Rgb([(x * 16) as u8, 0, 0]));
        let config = PaletteConfig {
            sample_step: 1,
            quantize_levels: 16,
            max_colors: 3,
        };
        assert_eq!(PaletteExtractor::new(config).extract(&img).len(), 3);
    }

    #[test]
    fn test_out_of_range_levels_are_clamped() {
        let img = ImageBuffer::from_fn(4, 1, |x, _| Rgb([(x * 60) as u8, 0, 0]));
        let mut config = every_pixel();
        config.quantize_levels = 512;
        let palette = PaletteExtractor::new(config.clone()).extract(&img);
        // 256 levels keeps every distinct red
        assert_eq!(palette.len(), 4);

        config.quantize_levels = 0;
        let palette = PaletteExtractor::new(config).extract(&img);
        // 2 levels splits at 128
        assert_eq!(palette.len(), 2);
        assert_eq!(palette[0].percentage, 75.0);
    }

    #[test]
    fn test_empty_image_has_no_palette() {
        assert!(PaletteExtractor::default().extract(&RgbImage::new(0, 0)).is_empty());
    }
}
