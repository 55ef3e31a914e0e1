//! Text printed on the card.

use chrono::{DateTime, FixedOffset, Local, Utc};

use crate::level::LevelProgress;

/// Gift text that needs the smaller font to fit its border.
pub const DOUBLE_CARD_GIFT: &str = "好感度双倍加持卡";

const UID_PLACEHOLDER: &str = "XXXX XXXX XXXX";

/// Sign times are shown in UTC+8.
const SIGN_TZ_OFFSET_SECS: i32 = 8 * 3600;

/// The three lines under the progress bar.
pub fn level_lines(bot_nickname: &str, progress: &LevelProgress) -> [String; 3] {
    [
        format!("· 好感度等级：{} [{}]", progress.tier.label, progress.tier.relation),
        format!("· {}对你的态度：{}", bot_nickname, progress.tier.attitude),
        format!("· 距离升级还差 {:.2} 好感度", progress.interpolation),
    ]
}

/// Console uid padded to 12 digits and grouped by four. A uid of 0 counts
/// as unlinked.
pub fn console_uid(uid: Option<u64>) -> String {
    let Some(uid) = uid.filter(|&u| u != 0) else {
        return UID_PLACEHOLDER.to_string();
    };
    let digits = format!("{:0>12}", uid);
    let (head, rest) = digits.split_at(4);
    let (mid, tail) = rest.split_at(4);
    format!("{} {} {}", head, mid, tail)
}

pub fn uid_line(uid: Option<u64>) -> String {
    format!("UID: {}", console_uid(uid))
}

pub fn gift_font_size(gift: &str) -> f32 {
    if gift.contains(DOUBLE_CARD_GIFT) {
        20.0
    } else {
        30.0
    }
}

fn gold_text(gold: Option<i64>) -> String {
    gold.map_or_else(|| "-".to_string(), |g| g.to_string())
}

/// Reward lines of the sign card. A doubled reward shows the base amount
/// times two.
pub fn reward_lines(delta_impression: f64, gold: Option<i64>, is_double: bool) -> Vec<String> {
    let affinity = if is_double {
        format!("好感度 + {:.2} × 2", delta_impression / 2.0)
    } else {
        format!("好感度 + {:.2}", delta_impression)
    };
    vec![affinity, format!("金币 + {}", gold_text(gold))]
}

/// Percentage shown on the view card.
pub fn setu_probability(initial_probability: f64, impression: f64) -> f64 {
    if impression < 100.0 {
        initial_probability * 100.0 + impression
    } else {
        100.0
    }
}

pub fn open_box_count(impression: f64) -> i64 {
    20 + (impression / 3.0) as i64
}

pub fn last_sign_text(last: Option<DateTime<Utc>>) -> String {
    match (last, FixedOffset::east_opt(SIGN_TZ_OFFSET_SECS)) {
        (Some(at), Some(tz)) => at.with_timezone(&tz).date_naive().to_string(),
        _ => "从未".to_string(),
    }
}

/// Status lines of the view card.
pub fn view_lines(
    last_sign: Option<DateTime<Utc>>,
    gold: Option<i64>,
    initial_probability: f64,
    impression: f64,
) -> Vec<String> {
    vec![
        format!("上次签到日期：{}", last_sign_text(last_sign)),
        format!("总金币：{}", gold_text(gold)),
        format!("色图概率：{:.2}%", setu_probability(initial_probability, impression)),
        format!("开箱次数：{}", open_box_count(impression)),
    ]
}

pub fn rank_line(rank: usize) -> String {
    format!("* 好感度排名第 {} 位", rank)
}

pub fn impression_line(impression: f64) -> String {
    format!("好感度：{:.2}", impression)
}

pub fn timestamp_line(now: &DateTime<Local>) -> String {
    format!("时间：{}", now.format("%Y-%m-%d %a %H:%M:%S"))
}

pub fn watermark(bot_nickname: &str, year: i32) -> String {
    format!("{}@{}", bot_nickname, year)
}
