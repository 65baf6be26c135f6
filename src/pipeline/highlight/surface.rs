use image::{Rgba, RgbaImage};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::SurfaceError;

/// A handle to a surface that may be shared between overlapping requests.
pub type SharedSurface<S> = Arc<Mutex<S>>;

pub fn shared<S: Surface>(surface: S) -> SharedSurface<S> {
    Arc::new(Mutex::new(surface))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// Plain source-over.
    Normal,
    /// Source-over with the `overlay` separable blend function.
    Overlay,
}

/// Something an overlay can be drawn onto.
pub trait Surface: Send {
    fn is_mounted(&self) -> bool;

    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Resize the surface, discarding its contents.
    fn resize(&mut self, width: u32, height: u32) -> Result<(), SurfaceError>;

    fn clear(&mut self);

    /// Draw `layer` over the current contents, aligned at the origin.
    fn composite(&mut self, layer: &RgbaImage, mode: BlendMode) -> Result<(), SurfaceError>;
}

/// An in-memory RGBA surface. An unmounted canvas has no pixels and refuses
/// to draw.
#[derive(Debug, Clone, Default)]
pub struct Canvas {
    buffer: Option<RgbaImage>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buffer: Some(RgbaImage::new(width, height)),
        }
    }

    pub fn unmounted() -> Self {
        Self { buffer: None }
    }

    pub fn mount(&mut self, width: u32, height: u32) {
        self.buffer = Some(RgbaImage::new(width, height));
    }

    pub fn unmount(&mut self) {
        self.buffer = None;
    }

    pub fn pixels(&self) -> Option<&RgbaImage> {
        self.buffer.as_ref()
    }

    /// True when every pixel is fully transparent.
    pub fn is_blank(&self) -> bool {
        self.buffer
            .as_ref()
            .map_or(true, |buffer| buffer.pixels().all(|p| p[3] == 0))
    }

    pub fn save_png(&self, path: &Path) -> Result<(), SurfaceError> {
        let buffer = self.buffer.as_ref().ok_or(SurfaceError::Unmounted)?;
        buffer.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}

impl Surface for Canvas {
    fn is_mounted(&self) -> bool {
        self.buffer.is_some()
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        self.buffer.as_ref().map(|b| b.dimensions())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), SurfaceError> {
        match self.buffer.as_mut() {
            Some(buffer) if buffer.dimensions() == (width, height) => {
                buffer.pixels_mut().for_each(|p| *p = Rgba([0, 0, 0, 0]));
                Ok(())
            }
            Some(buffer) => {
                *buffer = RgbaImage::new(width, height);
                Ok(())
            }
            None => Err(SurfaceError::Unmounted),
        }
    }

    fn clear(&mut self) {
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.pixels_mut().for_each(|p| *p = Rgba([0, 0, 0, 0]));
        }
    }

    fn composite(&mut self, layer: &RgbaImage, mode: BlendMode) -> Result<(), SurfaceError> {
        let buffer = self.buffer.as_mut().ok_or(SurfaceError::Unmounted)?;
        if buffer.dimensions() != layer.dimensions() {
            return Err(SurfaceError::SizeMismatch {
                layer_width: layer.width(),
                layer_height: layer.height(),
                surface_width: buffer.width(),
                surface_height: buffer.height(),
            });
        }
        for (dst, src) in buffer.pixels_mut().zip(layer.pixels()) {
            *dst = blend_pixel(*dst, *src, mode);
        }
        Ok(())
    }
}

#[inline]
fn overlay_channel(backdrop: f32, source: f32) -> f32 {
    // overlay(b, s) = hard_light(s, b)
    if backdrop <= 0.5 {
        2.0 * backdrop * source
    } else {
        let screen_in = 2.0 * backdrop - 1.0;
        screen_in + source - screen_in * source
    }
}

/// Composite one straight-alpha pixel over another.
pub fn blend_pixel(backdrop: Rgba<u8>, source: Rgba<u8>, mode: BlendMode) -> Rgba<u8> {
    let a_s = source[3] as f32 / 255.0;
    if a_s == 0.0 {
        return backdrop;
    }
    let a_b = backdrop[3] as f32 / 255.0;
    let a_o = a_s + a_b * (1.0 - a_s);

    let mut out = [0u8; 4];
    for c in 0..3 {
        let cs = source[c] as f32 / 255.0;
        let cb = backdrop[c] as f32 / 255.0;
        let mixed = match mode {
            BlendMode::Normal => cs,
            BlendMode::Overlay => overlay_channel(cb, cs),
        };
        let cs = (1.0 - a_b) * cs + a_b * mixed;
        let co = a_s * cs + a_b * cb * (1.0 - a_s);
        out[c] = ((co / a_o) * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (a_o * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_on_transparent_backdrop_keeps_source() {
        let clear = Rgba([0, 0, 0, 0]);
        for mode in [BlendMode::Normal, BlendMode::Overlay] {
            assert_eq!(blend_pixel(clear, Rgba([255, 50, 50, 200]), mode), Rgba([255, 50, 50, 200]));
            assert_eq!(blend_pixel(clear, Rgba([0, 0, 0, 140]), mode), Rgba([0, 0, 0, 140]));
        }
    }

    #[test]
    fn test_transparent_source_is_a_no_op() {
        let backdrop = Rgba([10, 20, 30, 255]);
        assert_eq!(blend_pixel(backdrop, Rgba([255, 255, 255, 0]), BlendMode::Overlay), backdrop);
    }

    #[test]
    fn test_overlay_on_opaque_backdrop() {
        // dark backdrop multiplies, light backdrop screens
        let dark = blend_pixel(Rgba([51, 51, 51, 255]), Rgba([255, 255, 255, 255]), BlendMode::Overlay);
        assert_eq!(dark, Rgba([102, 102, 102, 255]));
        let light = blend_pixel(Rgba([204, 204, 204, 255]), Rgba([0, 0, 0, 255]), BlendMode::Overlay);
        assert_eq!(light, Rgba([153, 153, 153, 255]));
    }

    #[test]
    fn test_normal_opaque_source_replaces() {
        let out = blend_pixel(Rgba([1, 2, 3, 255]), Rgba([9, 8, 7, 255]), BlendMode::Normal);
        assert_eq!(out, Rgba([9, 8, 7, 255]));
    }

    #[test]
    fn test_unmounted_canvas_refuses_to_draw() {
        let mut canvas = Canvas::unmounted();
        assert!(!canvas.is_mounted());
        assert!(matches!(canvas.resize(2, 2), Err(SurfaceError::Unmounted)));
        let layer = RgbaImage::new(2, 2);
        assert!(matches!(
            canvas.composite(&layer, BlendMode::Normal),
            Err(SurfaceError::Unmounted)
        ));
    }

    #[test]
    fn test_size_mismatch_is_rejected() {
        let mut canvas = Canvas::new(4, 4);
        let layer = RgbaImage::new(2, 2);
        assert!(matches!(
            canvas.composite(&layer, BlendMode::Normal),
            Err(SurfaceError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_resize_and_clear() {
        let mut canvas = Canvas::new(2, 2);
        canvas
            .composite(&RgbaImage::from_pixel(2, 2, Rgba([1, 1, 1, 255])), BlendMode::Normal)
            .unwrap();
        assert!(!canvas.is_blank());
        canvas.clear();
        assert!(canvas.is_blank());
        canvas.resize(5, 3).unwrap();
        assert_eq!(canvas.dimensions(), Some((5, 3)));
    }
}
