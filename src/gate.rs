use std::path::PathBuf;

use mockable::Clock;

use crate::cache::CardCache;
use crate::error::CardError;
use crate::records::SignUser;
use crate::render::{CardRenderer, CardRequest};
use crate::types::{CardKey, CardVariant};

/// `delta_impression` value meaning "no sign-in happened, just show the
/// status card".
pub const VIEW_ONLY_DELTA: f64 = -1.0;

/// Serves today's card for a user from the cache directory, rendering it
/// only when it is not there yet.
///
/// The existence check and the write are not atomic: two calls racing on the
/// same key may both render, and the later write wins.
pub struct CardGate<R, C> {
    cache: CardCache,
    renderer: R,
    clock: C,
}

impl<R: CardRenderer, C: Clock> CardGate<R, C> {
    pub fn new(cache: CardCache, renderer: R, clock: C) -> Self {
        Self {
            cache,
            renderer,
            clock,
        }
    }

    pub fn cache(&self) -> &CardCache {
        &self.cache
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Path of today's card for `user`, rendering and storing it first if
    /// needed.
    ///
    /// With `delta_impression == VIEW_ONLY_DELTA` an existing view card is
    /// returned as is; otherwise a view card is rendered, whatever
    /// `is_card_view` says.
    #[allow(clippy::too_many_arguments)]
    pub fn get_or_render(
        &mut self,
        user: &SignUser,
        nickname: &str,
        delta_impression: f64,
        gold: Option<i64>,
        gift: &str,
        is_double: bool,
        is_card_view: bool,
    ) -> Result<PathBuf, CardError> {
        let now = self.clock.local();
        let date = now.date_naive();

        let key = CardKey::new(
            user.user_id.as_str(),
            CardVariant::from_view_flag(is_card_view),
            date,
        );
        if let Some(path) = self.cache.lookup(&key) {
            tracing::debug!(path = %path.display(), "sign card cache hit");
            return Ok(path);
        }

        let mut variant = key.variant;
        if delta_impression == VIEW_ONLY_DELTA {
            let view_key = CardKey::new(user.user_id.as_str(), CardVariant::View, date);
            if let Some(path) = self.cache.lookup(&view_key) {
                tracing::debug!(path = %path.display(), "view card cache hit");
                return Ok(path);
            }
            variant = CardVariant::View;
        }

        let request = CardRequest {
            user,
            nickname,
            delta_impression,
            gold,
            gift,
            is_double,
            variant,
            now,
        };
        let card = self.renderer.render(&request)?;
        self.cache
            .put(&CardKey::new(user.user_id.as_str(), variant, date), &card)
    }
}
