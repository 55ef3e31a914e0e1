use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CardError;

/// Settings for card rendering. Every field has a default, so a partial or
/// missing config file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    /// Root of the image tree; cards land in `{image_root}/sign/today_card`.
    pub image_root: PathBuf,
    /// Directory of background pictures, one picked at random per card.
    pub background_dir: PathBuf,
    /// TrueType/OpenType font used for every text element. Without it the
    /// card is composed with no glyphs.
    pub font_path: Option<PathBuf>,
    /// Name the bot signs the card with.
    pub bot_nickname: String,
    /// Base probability shown on the view card, in `[0, 1]`.
    pub initial_setu_probability: f64,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            image_root: PathBuf::from("resources/image"),
            background_dir: PathBuf::from("resources/image/sign/sign_background"),
            font_path: None,
            bot_nickname: "小真寻".to_string(),
            initial_setu_probability: 0.7,
        }
    }
}

impl CardConfig {
    /// Read a JSON config. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, CardError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no card config found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(CardError::io(path)(e)),
        };
        serde_json::from_str(&raw).map_err(|source| CardError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Config rooted at `image_root`, with backgrounds under it.
    pub fn rooted_at(image_root: impl Into<PathBuf>) -> Self {
        let image_root = image_root.into();
        Self {
            background_dir: image_root.join("sign").join("sign_background"),
            image_root,
            ..Self::default()
        }
    }

    pub fn card_dir(&self) -> PathBuf {
        self.image_root.join("sign").join("today_card")
    }

    pub fn resource_dir(&self) -> PathBuf {
        self.image_root.join("sign").join("resource")
    }

    pub fn border_dir(&self) -> PathBuf {
        self.image_root.join("sign").join("sign_border")
    }
}
