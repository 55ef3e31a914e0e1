//! One sign-in request: credit affinity at most once per day, then hand
//! back the matching card.

use std::cell::RefCell;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use mockable::Clock;

use crate::error::CardError;
use crate::gate::{CardGate, VIEW_ONLY_DELTA};
use crate::records::{MemoryRecords, SignRecords};
use crate::render::CardRenderer;
use crate::types::today;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutcome {
    /// Affinity and the sign count were updated; the path is the sign card.
    Signed(PathBuf),
    /// The user had already signed today; records are untouched.
    AlreadySigned(PathBuf),
}

impl SignOutcome {
    pub fn path(&self) -> &PathBuf {
        match self {
            SignOutcome::Signed(path) | SignOutcome::AlreadySigned(path) => path,
        }
    }
}

/// Whether the latest sign of `user_id` falls on `date` in local time.
pub fn signed_on<S: SignRecords + ?Sized>(records: &S, user_id: &str, date: NaiveDate) -> bool {
    records
        .last_sign_time(user_id)
        .is_some_and(|at| at.with_timezone(&Local).date_naive() == date)
}

/// Sign `user_id` in. A repeat on the same day leaves the records alone and
/// asks the gate for the card with [`VIEW_ONLY_DELTA`].
#[allow(clippy::too_many_arguments)]
pub fn sign_in<R: CardRenderer, C: Clock>(
    gate: &mut CardGate<R, C>,
    records: &RefCell<MemoryRecords>,
    user_id: &str,
    nickname: &str,
    delta_impression: f64,
    gold: i64,
    gift: &str,
    is_double: bool,
) -> Result<SignOutcome, CardError> {
    let date = today(gate.clock());
    let already = signed_on(&*records.borrow(), user_id, date);

    if already {
        let user = records
            .borrow()
            .user(user_id)
            .cloned()
            .ok_or_else(|| CardError::UnknownUser(user_id.to_string()))?;
        tracing::debug!(user_id, "already signed today");
        let path =
            gate.get_or_render(&user, nickname, VIEW_ONLY_DELTA, Some(gold), "", false, false)?;
        return Ok(SignOutcome::AlreadySigned(path));
    }

    let at = gate.clock().utc();
    // the renderer reads the same records, so the borrow ends here
    let user = records.borrow_mut().record_sign(user_id, delta_impression, at)?;
    let path = gate.get_or_render(
        &user,
        nickname,
        delta_impression,
        Some(gold),
        gift,
        is_double,
        false,
    )?;
    Ok(SignOutcome::Signed(path))
}
