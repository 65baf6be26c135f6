use image::RgbImage;
use serde::Serialize;

use crate::common::color::rgb_to_luma;

pub const BINS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Red,
    Green,
    Blue,
    Luminance,
}

/// 256-bin per-channel histogram, as drawn under the media viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub red: Vec<u32>,
    pub green: Vec<u32>,
    pub blue: Vec<u32>,
    pub luminance: Vec<u32>,
    pub total: u64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            red: vec![0; BINS],
            green: vec![0; BINS],
            blue: vec![0; BINS],
            luminance: vec![0; BINS],
            total: 0,
        }
    }
}

impl Histogram {
    pub fn compute(image: &RgbImage) -> Self {
        let mut histogram = Self::default();
        for px in image.pixels() {
            let [r, g, b] = px.0;
            histogram.red[r as usize] += 1;
            histogram.green[g as usize] += 1;
            histogram.blue[b as usize] += 1;
            let luma = rgb_to_luma(r, g, b).round().clamp(0.0, 255.0) as usize;
            histogram.luminance[luma] += 1;
        }
        histogram.total = image.width() as u64 * image.height() as u64;
        histogram
    }

    pub fn channel(&self, channel: Channel) -> &[u32] {
        match channel {
            Channel::Red => &self.red,
            Channel::Green => &self.green,
            Channel::Blue => &self.blue,
            Channel::Luminance => &self.luminance,
        }
    }

    pub fn mean(&self, channel: Channel) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        let sum: u64 = self
            .channel(channel)
            .iter()
            .enumerate()
            .map(|(value, count)| value as u64 * *count as u64)
            .sum();
        sum as f32 / self.total as f32
    }

    /// Smallest level at or below which `p` percent of the pixels fall.
    pub fn percentile(&self, channel: Channel, p: f32) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let target = ((p.clamp(0.0, 100.0) / 100.0) * self.total as f32).ceil().max(1.0) as u64;
        let mut seen = 0u64;
        for (value, count) in self.channel(channel).iter().enumerate() {
            seen += *count as u64;
            if seen >= target {
                return value as u8;
            }
        }
        255
    }

    /// The most populated level and its count.
    pub fn peak(&self, channel: Channel) -> (u8, u32) {
        let mut best = (0u8, 0u32);
        for (value, count) in self.channel(channel).iter().enumerate() {
            if *count > best.1 {
                best = (value as u8, *count);
            }
        }
        best
    }

    /// Bin heights scaled so the tallest bin is 1.0.
    pub fn normalized(&self, channel: Channel) -> Vec<f32> {
        let (_, peak) = self.peak(channel);
        if peak == 0 {
            return vec![0.0; BINS];
        }
        self.channel(channel)
            .iter()
            .map(|count| *count as f32 / peak as f32)
            .collect()
    }
}
