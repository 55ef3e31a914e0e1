use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use image::{ImageFormat, RgbaImage};

use crate::error::CardError;
use crate::types::{date_tag, CardKey};

/// Flat directory of rendered cards. A file's existence is the cache entry.
#[derive(Debug, Clone)]
pub struct CardCache {
    dir: PathBuf,
}

impl CardCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> Result<(), CardError> {
        fs::create_dir_all(&self.dir).map_err(CardError::io(&self.dir))
    }

    pub fn path_for(&self, key: &CardKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Path of the card for `key` if it was already rendered.
    pub fn lookup(&self, key: &CardKey) -> Option<PathBuf> {
        let path = self.path_for(key);
        if path.is_file() {
            Some(path)
        } else {
            None
        }
    }

    /// Write `card` as PNG under the key's file name, replacing any file
    /// already there.
    pub fn put(&self, key: &CardKey, card: &RgbaImage) -> Result<PathBuf, CardError> {
        self.ensure_dir()?;
        let path = self.path_for(key);
        card.save_with_format(&path, ImageFormat::Png)?;
        Ok(path)
    }

    /// Delete every card whose name does not carry `today`'s date.
    /// Returns how many files were removed.
    pub fn sweep(&self, today: NaiveDate) -> Result<usize, CardError> {
        let tag = date_tag(today);
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir).map_err(CardError::io(&self.dir))? {
            let entry = entry.map_err(CardError::io(&self.dir))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if entry.file_name().to_string_lossy().contains(&tag) {
                continue;
            }
            fs::remove_file(&path).map_err(CardError::io(&path))?;
            removed += 1;
        }
        tracing::info!(dir = %self.dir.display(), %today, removed, "swept stale sign cards");
        Ok(removed)
    }
}
