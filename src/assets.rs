//! Startup preparation: directories, progress-bar images, daily sweep.

use std::fs;
use std::path::Path;

use image::{ImageFormat, Rgba, RgbaImage};
use mockable::Clock;

use crate::cache::CardCache;
use crate::config::CardConfig;
use crate::draw::{horizontal_gradient, make_circle, overlay_alpha, solid};
use crate::error::CardError;
use crate::types::today;

pub const BAR_FILE: &str = "bar.png";
pub const BAR_WHITE_FILE: &str = "bar_white.png";

const BAR_WIDTH: u32 = 1000;
const BAR_HEIGHT: u32 = 50;
const BAR_LEFT: [u8; 3] = [0, 245, 246];
const BAR_RIGHT: [u8; 3] = [254, 1, 254];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupReport {
    pub bars_generated: bool,
    pub cards_swept: usize,
}

/// Create the card and resource directories, generate the bar images if
/// absent and drop cards from earlier days.
pub fn startup<C: Clock + ?Sized>(
    config: &CardConfig,
    clock: &C,
) -> Result<StartupReport, CardError> {
    let resource_dir = config.resource_dir();
    fs::create_dir_all(&resource_dir).map_err(CardError::io(&resource_dir))?;
    let cache = CardCache::new(config.card_dir());
    cache.ensure_dir()?;

    let bars_generated = ensure_progress_bars(&resource_dir)?;
    let cards_swept = cache.sweep(today(clock))?;
    Ok(StartupReport {
        bars_generated,
        cards_swept,
    })
}

/// Write `bar.png` and `bar_white.png` unless both exist. Returns whether
/// anything was written.
pub fn ensure_progress_bars(resource_dir: &Path) -> Result<bool, CardError> {
    let bar = resource_dir.join(BAR_FILE);
    let bar_white = resource_dir.join(BAR_WHITE_FILE);
    if bar.is_file() && bar_white.is_file() {
        return Ok(false);
    }
    capsule_bar(BAR_LEFT, BAR_RIGHT).save_with_format(&bar, ImageFormat::Png)?;
    capsule_bar([255; 3], [255; 3]).save_with_format(&bar_white, ImageFormat::Png)?;
    tracing::info!(dir = %resource_dir.display(), "generated progress bar images");
    Ok(true)
}

fn opaque(rgb: [u8; 3]) -> Rgba<u8> {
    Rgba([rgb[0], rgb[1], rgb[2], 255])
}

/// A 1000x50 bar with half-circle caps, shading from `from` on the left to
/// `to` on the right.
pub fn capsule_bar(from: [u8; 3], to: [u8; 3]) -> RgbaImage {
    let cap = BAR_HEIGHT;
    let half = cap / 2;
    let mut bar = solid(BAR_WIDTH, BAR_HEIGHT, Rgba([0, 0, 0, 0]));

    let left = make_circle(solid(cap, cap, opaque(from)));
    let left_half = image::imageops::crop_imm(&left, 0, 0, half, cap).to_image();
    overlay_alpha(&mut bar, &left_half, 0, 0);

    let body_width = BAR_WIDTH - cap;
    let body = horizontal_gradient(body_width, BAR_HEIGHT, from, to);
    overlay_alpha(&mut bar, &body, i64::from(half), 0);

    let right = make_circle(solid(cap, cap, opaque(to)));
    let right_half = image::imageops::crop_imm(&right, half, 0, half, cap).to_image();
    overlay_alpha(&mut bar, &right_half, i64::from(BAR_WIDTH - half), 0);
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_bar_has_caps_and_body() {
        let bar = capsule_bar(BAR_LEFT, BAR_RIGHT);
        assert_eq!(bar.dimensions(), (1000, 50));
        // rounded corners stay transparent
        assert_eq!(bar.get_pixel(0, 0).0[3], 0);
        assert_eq!(bar.get_pixel(999, 49).0[3], 0);
        assert_eq!(bar.get_pixel(5, 25), &Rgba([0, 245, 246, 255]));
        assert_eq!(bar.get_pixel(25, 25), &Rgba([0, 245, 246, 255]));
        assert_eq!(bar.get_pixel(995, 25), &Rgba([254, 1, 254, 255]));
    }

    #[test]
    fn bars_are_generated_once() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(ensure_progress_bars(tmp.path()).unwrap());
        assert!(tmp.path().join(BAR_FILE).is_file());
        assert!(tmp.path().join(BAR_WHITE_FILE).is_file());
        assert!(!ensure_progress_bars(tmp.path()).unwrap());

        let white = image::open(tmp.path().join(BAR_WHITE_FILE)).unwrap().to_rgba8();
        assert_eq!(white.get_pixel(500, 25), &Rgba([255, 255, 255, 255]));
    }
}
