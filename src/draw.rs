//! Pixel-level helpers shared by the card renderer and the asset generator.

use std::fs;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use rusttype::{point, Font, Scale};

use crate::error::CardError;

pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

pub fn solid(width: u32, height: u32, color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_pixel(width, height, color)
}

/// Load an image from disk and stretch it to `width` x `height`.
pub fn load_fitted(path: &Path, width: u32, height: u32) -> Result<RgbaImage, CardError> {
    let img = image::open(path)?.to_rgba8();
    Ok(fit(&img, width, height))
}

pub fn fit(img: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if img.width() == width && img.height() == height {
        return img.clone();
    }
    imageops::resize(img, width, height, FilterType::Triangle)
}

fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>, coverage: f32) {
    let sa = (src.0[3] as f32 / 255.0) * coverage;
    if sa <= 0.0 {
        return;
    }
    let da = dst.0[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for c in 0..3 {
        let s = src.0[c] as f32;
        let d = dst.0[c] as f32;
        dst.0[c] = ((s * sa + d * da * (1.0 - sa)) / out_a).round() as u8;
    }
    dst.0[3] = (out_a * 255.0).round() as u8;
}

/// Composite `over` onto `base` with its top-left corner at (`x`, `y`).
/// Pixels falling outside `base` are dropped.
pub fn overlay_alpha(base: &mut RgbaImage, over: &RgbaImage, x: i64, y: i64) {
    for (ox, oy, p) in over.enumerate_pixels() {
        let bx = x + i64::from(ox);
        let by = y + i64::from(oy);
        if bx < 0 || by < 0 || bx >= i64::from(base.width()) || by >= i64::from(base.height()) {
            continue;
        }
        blend(base.get_pixel_mut(bx as u32, by as u32), *p, 1.0);
    }
}

/// Composite `over` centred on `base`.
pub fn overlay_centered(base: &mut RgbaImage, over: &RgbaImage) {
    let x = (i64::from(base.width()) - i64::from(over.width())) / 2;
    let y = (i64::from(base.height()) - i64::from(over.height())) / 2;
    overlay_alpha(base, over, x, y);
}

/// Clear everything outside the inscribed circle.
pub fn make_circle(mut img: RgbaImage) -> RgbaImage {
    let (w, h) = (img.width(), img.height());
    let cx = (w as f32 - 1.0) / 2.0;
    let cy = (h as f32 - 1.0) / 2.0;
    let r = w.min(h) as f32 / 2.0;
    for (x, y, p) in img.enumerate_pixels_mut() {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        if (dx * dx + dy * dy).sqrt() > r {
            p.0[3] = 0;
        }
    }
    img
}

/// Set every pixel's alpha to `alpha`.
pub fn with_alpha(mut img: RgbaImage, alpha: u8) -> RgbaImage {
    for p in img.pixels_mut() {
        p.0[3] = alpha;
    }
    img
}

/// Linear left-to-right blend from `from` to `to`.
pub fn horizontal_gradient(width: u32, height: u32, from: [u8; 3], to: [u8; 3]) -> RgbaImage {
    let mut img = solid(width, height, TRANSPARENT);
    let steps: [f32; 3] =
        std::array::from_fn(|c| (to[c] as f32 - from[c] as f32) / width.max(1) as f32);
    for (x, _, p) in img.enumerate_pixels_mut() {
        for c in 0..3 {
            p.0[c] = (from[c] as f32 + steps[c] * x as f32).round() as u8;
        }
        p.0[3] = 255;
    }
    img
}

/// Draws text with an optional font. Without a font every call is a no-op
/// and every width is zero, so layouts still work.
pub struct TextPainter {
    font: Option<Font<'static>>,
}

impl TextPainter {
    pub fn without_font() -> Self {
        Self { font: None }
    }

    pub fn load(path: &Path) -> Result<Self, CardError> {
        let bytes = fs::read(path).map_err(CardError::io(path))?;
        let font = Font::try_from_vec(bytes).ok_or_else(|| CardError::Font {
            path: path.to_path_buf(),
        })?;
        Ok(Self { font: Some(font) })
    }

    pub fn width(&self, px: f32, text: &str) -> f32 {
        let Some(font) = &self.font else {
            return 0.0;
        };
        if text.is_empty() {
            return 0.0;
        }
        let scale = Scale::uniform(px);
        let v_metrics = font.v_metrics(scale);
        font
            .layout(text, scale, point(0.0, v_metrics.ascent))
            .filter_map(|g| g.pixel_bounding_box())
            .map(|bb| bb.max.x as f32)
            .fold(0.0, f32::max)
    }

    pub fn height(&self, px: f32) -> f32 {
        match &self.font {
            Some(font) => {
                let vm = font.v_metrics(Scale::uniform(px));
                (vm.ascent - vm.descent).max(1.0)
            }
            None => 0.0,
        }
    }

    /// Draw `text` with its top-left corner at (`x`, `y`).
    pub fn draw(&self, img: &mut RgbaImage, px: f32, x: i32, y: i32, color: Rgba<u8>, text: &str) {
        let Some(font) = &self.font else {
            return;
        };
        let scale = Scale::uniform(px);
        let v_metrics = font.v_metrics(scale);
        let origin = point(x as f32, y as f32 + v_metrics.ascent);
        for glyph in font.layout(text, scale, origin) {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            glyph.draw(|gx, gy, v| {
                let dx = gx as i32 + bb.min.x;
                let dy = gy as i32 + bb.min.y;
                if dx < 0 || dy < 0 || dx as u32 >= img.width() || dy as u32 >= img.height() {
                    return;
                }
                blend(img.get_pixel_mut(dx as u32, dy as u32), color, v);
            });
        }
    }

    /// Draw `text` centred on (`cx`, `cy`).
    pub fn draw_centered(
        &self,
        img: &mut RgbaImage,
        px: f32,
        cx: f32,
        cy: f32,
        color: Rgba<u8>,
        text: &str,
    ) {
        let x = (cx - self.width(px, text) / 2.0).round() as i32;
        let y = (cy - self.height(px) / 2.0).round() as i32;
        self.draw(img, px, x, y, color, text);
    }
}
