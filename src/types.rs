use std::fmt;

use chrono::NaiveDate;
use mockable::Clock;

/// Which flavour of card is rendered: the full sign-in card or the
/// view-only status card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardVariant {
    Sign,
    View,
}

impl CardVariant {
    pub fn from_view_flag(is_card_view: bool) -> Self {
        if is_card_view {
            CardVariant::View
        } else {
            CardVariant::Sign
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CardVariant::Sign => "sign",
            CardVariant::View => "view",
        }
    }
}

impl fmt::Display for CardVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one rendered card file: one per user, variant and day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CardKey {
    pub user_id: String,
    pub variant: CardVariant,
    pub date: NaiveDate,
}

impl CardKey {
    pub fn new(user_id: impl Into<String>, variant: CardVariant, date: NaiveDate) -> Self {
        Self {
            user_id: user_id.into(),
            variant,
            date,
        }
    }

    /// `{user_id}_{sign|view}_{YYYY-MM-DD}.png`
    pub fn file_name(&self) -> String {
        format!("{}_{}_{}.png", self.user_id, self.variant, date_tag(self.date))
    }
}

/// The date fragment every card file name carries; the sweep matches on it.
pub fn date_tag(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn today<C: Clock + ?Sized>(clock: &C) -> NaiveDate {
    clock.local().date_naive()
}
