use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::{DateTime, Datelike, Local};
use image::{Rgba, RgbaImage};
use rand::seq::SliceRandom;

use crate::assets::{BAR_FILE, BAR_WHITE_FILE};
use crate::avatar::{load_avatar, AvatarSource};
use crate::caption;
use crate::config::CardConfig;
use crate::draw::{
    fit, load_fitted, make_circle, overlay_alpha, overlay_centered, solid, with_alpha,
    TextPainter, BLACK, TRANSPARENT, WHITE,
};
use crate::error::CardError;
use crate::level::ThresholdTable;
use crate::records::{SignRecords, SignUser};
use crate::types::CardVariant;

pub const CARD_WIDTH: u32 = 876;
pub const CARD_HEIGHT: u32 = 424;

const PANEL_HEIGHT: u32 = 274;
const PANEL_TOP: i32 = 150;
const PANEL_ALPHA: u8 = 200;
const BAR_FILL_WIDTH: u32 = 220;
const BAR_FILL_HEIGHT: u32 = 20;

const AVATAR_BORDER_FILE: &str = "ava_border_01.png";
const GIFT_BORDER_FILE: &str = "gift_border_02.png";

const FALLBACK_BACKGROUND: Rgba<u8> = Rgba([96, 110, 140, 255]);
const SIGN_DAYS_COLOR: Rgba<u8> = Rgba([211, 64, 33, 255]);
const WATERMARK_COLOR: Rgba<u8> = Rgba([155, 155, 155, 255]);

/// Everything needed to draw one card.
#[derive(Debug, Clone)]
pub struct CardRequest<'a> {
    pub user: &'a SignUser,
    pub nickname: &'a str,
    /// Affinity gained by today's sign-in.
    pub delta_impression: f64,
    pub gold: Option<i64>,
    pub gift: &'a str,
    pub is_double: bool,
    pub variant: CardVariant,
    pub now: DateTime<Local>,
}

// Turns a request into pixels. Persisting the result is the caller's job.
pub trait CardRenderer {
    fn render(&mut self, request: &CardRequest<'_>) -> Result<RgbaImage, CardError>;
}

/// Width of the filled part of the progress bar; never less than one pixel.
pub fn bar_fill_width(ratio: f64) -> u32 {
    let width = (f64::from(BAR_FILL_WIDTH) * ratio) as i64;
    width.clamp(1, i64::from(BAR_FILL_WIDTH)) as u32
}

/// Card renderer backed by the `image` crate.
pub struct ImageCardRenderer<R, A> {
    config: CardConfig,
    table: &'static ThresholdTable,
    painter: TextPainter,
    records: Rc<RefCell<R>>,
    avatars: A,
}

impl<R: SignRecords, A: AvatarSource> ImageCardRenderer<R, A> {
    /// Fails only when a font is configured but cannot be loaded.
    pub fn new(config: CardConfig, records: Rc<RefCell<R>>, avatars: A) -> Result<Self, CardError> {
        let painter = match &config.font_path {
            Some(path) => TextPainter::load(path)?,
            None => {
                tracing::warn!("no font configured, cards will be drawn without text");
                TextPainter::without_font()
            }
        };
        Ok(Self {
            config,
            table: ThresholdTable::standard(),
            painter,
            records,
            avatars,
        })
    }

    fn background(&self) -> Result<RgbaImage, CardError> {
        let dir = &self.config.background_dir;
        let mut choices: Vec<PathBuf> = match fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect(),
            Err(error) => {
                tracing::debug!(dir = %dir.display(), %error, "background directory unreadable");
                Vec::new()
            }
        };
        choices.sort();
        match choices.choose(&mut rand::thread_rng()) {
            Some(path) => load_fitted(path, CARD_WIDTH, CARD_HEIGHT),
            None => Ok(solid(CARD_WIDTH, CARD_HEIGHT, FALLBACK_BACKGROUND)),
        }
    }

    fn optional_asset(&self, path: &Path, width: u32, height: u32) -> Option<RgbaImage> {
        if !path.is_file() {
            return None;
        }
        match load_fitted(path, width, height) {
            Ok(img) => Some(img),
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    %error,
                    "skipping unreadable card decoration"
                );
                None
            }
        }
    }

    fn avatar_tile(&self, user: &SignUser) -> RgbaImage {
        let mut tile = solid(140, 140, TRANSPARENT);
        let avatar = make_circle(load_avatar(&self.avatars, user, 107));
        overlay_alpha(&mut tile, &avatar, 19, 18);
        let border_path = self.config.border_dir().join(AVATAR_BORDER_FILE);
        if let Some(border) = self.optional_asset(&border_path, 140, 140) {
            overlay_centered(&mut tile, &border);
        }
        tile
    }

    fn gift_tile(&self, gift: &str) -> RgbaImage {
        let border_path = self.config.border_dir().join(GIFT_BORDER_FILE);
        let mut tile = self
            .optional_asset(&border_path, 270, 100)
            .unwrap_or_else(|| solid(270, 100, TRANSPARENT));
        self.painter
            .draw_centered(&mut tile, caption::gift_font_size(gift), 135.0, 50.0, BLACK, gift);
        tile
    }

    fn progress_bar(&self, ratio: f64) -> Result<RgbaImage, CardError> {
        let resource_dir = self.config.resource_dir();
        let white_path = resource_dir.join(BAR_WHITE_FILE);
        let mut bar = load_fitted(&white_path, BAR_FILL_WIDTH, BAR_FILL_HEIGHT)?;
        let fill = load_fitted(&resource_dir.join(BAR_FILE), BAR_FILL_WIDTH, BAR_FILL_HEIGHT)?;
        let fill = fit(&fill, bar_fill_width(ratio), BAR_FILL_HEIGHT);
        overlay_alpha(&mut bar, &fill, 0, 0);
        Ok(bar)
    }

    fn draw_check_in_tip(&self, canvas: &mut RgbaImage, sign_count: u32) {
        let lead = "Accumulative check-in for";
        let count = sign_count.to_string();
        let lead_w = self.painter.width(30.0, lead) as i32;
        let count_w = self.painter.width(40.0, &count) as i32;
        self.painter.draw(canvas, 30.0, 10, 174, BLACK, lead);
        self.painter.draw(canvas, 40.0, 10 + lead_w + 7, 167, SIGN_DAYS_COLOR, &count);
        self.painter.draw(canvas, 30.0, 10 + lead_w + count_w + 15, 174, BLACK, "days");
    }
}

impl<R: SignRecords, A: AvatarSource> CardRenderer for ImageCardRenderer<R, A> {
    fn render(&mut self, request: &CardRequest<'_>) -> Result<RgbaImage, CardError> {
        let user = request.user;
        let progress = self.table.resolve(user.impression).progress(user.impression);

        let mut canvas = self.background()?;
        let mut panel = with_alpha(solid(CARD_WIDTH, PANEL_HEIGHT, WHITE), PANEL_ALPHA);
        overlay_alpha(&mut panel, &self.avatar_tile(user), 25, 80);
        overlay_alpha(&mut panel, &solid(2, 180, BLACK), 200, 70);
        if request.variant == CardVariant::Sign {
            overlay_alpha(&mut panel, &self.gift_tile(request.gift), 570, 140);
        }
        overlay_alpha(&mut canvas, &panel, 0, i64::from(PANEL_TOP));
        overlay_alpha(&mut canvas, &self.progress_bar(progress.ratio)?, 225, 275);

        let p = &self.painter;
        p.draw(&mut canvas, 50.0, 30, 15, WHITE, request.nickname);
        p.draw(&mut canvas, 30.0, 30, 85, WHITE, &caption::uid_line(user.console_uid));
        self.draw_check_in_tip(&mut canvas, user.sign_count);
        p.draw(&mut canvas, 20.0, 220, 240, BLACK, "当前");
        p.draw(&mut canvas, 30.0, 262, 234, BLACK, &caption::impression_line(user.impression));
        let level_lines = caption::level_lines(&self.config.bot_nickname, &progress);
        for (i, line) in level_lines.iter().enumerate() {
            p.draw(&mut canvas, 15.0, 220, 305 + 20 * i as i32, BLACK, line);
        }

        let (title, lines) = match request.variant {
            CardVariant::View => {
                let records = self.records.borrow();
                let rank = records
                    .impression_rank(&user.user_id)
                    .ok_or_else(|| CardError::UnknownUser(user.user_id.clone()))?;
                let rank_text = caption::rank_line(rank);
                let rank_x = CARD_WIDTH as i32 - p.width(30.0, &rank_text) as i32 - 32;
                p.draw(&mut canvas, 30.0, rank_x, PANEL_TOP + 20, BLACK, &rank_text);
                let lines = caption::view_lines(
                    records.last_sign_time(&user.user_id),
                    request.gold,
                    self.config.initial_setu_probability,
                    user.impression,
                );
                ("", lines)
            }
            CardVariant::Sign => (
                "今日签到",
                caption::reward_lines(request.delta_impression, request.gold, request.is_double),
            ),
        };
        p.draw(&mut canvas, 30.0, 550, 180, BLACK, title);
        for (i, line) in lines.iter().enumerate() {
            p.draw(&mut canvas, 20.0, 580, 220 + 25 * i as i32, BLACK, line);
        }

        p.draw(&mut canvas, 20.0, 220, 370, BLACK, &caption::timestamp_line(&request.now));
        p.draw(
            &mut canvas,
            15.0,
            15,
            400,
            WATERMARK_COLOR,
            &caption::watermark(&self.config.bot_nickname, request.now.year()),
        );

        tracing::info!(
            user_id = %user.user_id,
            variant = %request.variant,
            level = progress.tier.label,
            "rendered sign card"
        );
        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 1)]
    #[case(0.001, 1)]
    #[case(0.5, 110)]
    #[case(1.0, 220)]
    #[case(-0.4, 1)]
    #[case(3.0, 220)]
    fn bar_fill_is_at_least_one_pixel(#[case] ratio: f64, #[case] expected: u32) {
        assert_eq!(bar_fill_width(ratio), expected);
    }
}
