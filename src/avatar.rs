use std::collections::HashMap;

use image::{Rgba, RgbaImage};

use crate::draw::{fit, solid};
use crate::records::SignUser;

/// Only avatars from this platform are fetched; everyone else gets the
/// placeholder.
pub const AVATAR_PLATFORM: &str = "qq";

const PLACEHOLDER: Rgba<u8> = Rgba([0, 0, 0, 255]);

// Where avatar bytes come from (usually the chat platform's CDN).
pub trait AvatarSource {
    fn fetch(&self, user_id: &str) -> Option<Vec<u8>>;
}

/// Source that never has an avatar.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAvatars;

impl AvatarSource for NoAvatars {
    fn fetch(&self, _user_id: &str) -> Option<Vec<u8>> {
        None
    }
}

/// Encoded avatar images keyed by user id.
#[derive(Debug, Clone, Default)]
pub struct MemoryAvatars {
    images: HashMap<String, Vec<u8>>,
}

impl MemoryAvatars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, user_id: impl Into<String>, bytes: Vec<u8>) {
        self.images.insert(user_id.into(), bytes);
    }
}

impl AvatarSource for MemoryAvatars {
    fn fetch(&self, user_id: &str) -> Option<Vec<u8>> {
        self.images.get(user_id).cloned()
    }
}

/// Square avatar of `size` pixels. Falls back to a solid placeholder when
/// the platform has no avatars, the source has nothing, or the bytes do not
/// decode.
pub fn load_avatar<A: AvatarSource + ?Sized>(source: &A, user: &SignUser, size: u32) -> RgbaImage {
    if user.platform != AVATAR_PLATFORM {
        return solid(size, size, PLACEHOLDER);
    }
    let Some(bytes) = source.fetch(&user.user_id) else {
        tracing::debug!(user_id = %user.user_id, "no avatar available, using placeholder");
        return solid(size, size, PLACEHOLDER);
    };
    match image::load_from_memory(&bytes) {
        Ok(img) => fit(&img.to_rgba8(), size, size),
        Err(error) => {
            tracing::warn!(user_id = %user.user_id, %error, "avatar bytes did not decode");
            solid(size, size, PLACEHOLDER)
        }
    }
}
