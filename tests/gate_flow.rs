use std::fs;

use chrono::{DateTime, Local, TimeZone, Utc};
use image::{Rgba, RgbaImage};
use mockable::Clock;

use sign_card::cache::CardCache;
use sign_card::error::CardError;
use sign_card::gate::{CardGate, VIEW_ONLY_DELTA};
use sign_card::records::SignUser;
use sign_card::render::{CardRenderer, CardRequest};
use sign_card::types::{CardKey, CardVariant};

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Records every request and hands back a 2x2 image.
#[derive(Default)]
struct CountingRenderer {
    calls: Vec<(String, CardVariant)>,
}

impl CardRenderer for CountingRenderer {
    fn render(&mut self, request: &CardRequest<'_>) -> Result<RgbaImage, CardError> {
        self.calls.push((request.user.user_id.clone(), request.variant));
        Ok(RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255])))
    }
}

fn noon(day: u32) -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2024, 6, day, 12, 0, 0).unwrap())
}

fn user(id: &str) -> SignUser {
    SignUser {
        impression: 42.0,
        sign_count: 3,
        ..SignUser::new(id, "qq")
    }
}

#[test]
fn same_day_sign_renders_once() {
    let tmp = tempfile::tempdir().unwrap();
    let clock = noon(10);
    let date = clock.local().date_naive();
    let mut gate = CardGate::new(CardCache::new(tmp.path()), CountingRenderer::default(), clock);
    let alice = user("1001");

    let first = gate
        .get_or_render(&alice, "alice", 2.5, Some(40), "一杯奶茶", false, false)
        .unwrap();
    let second = gate
        .get_or_render(&alice, "alice", 2.5, Some(40), "一杯奶茶", false, false)
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first, tmp.path().join(format!("1001_sign_{}.png", date)));
    assert!(first.is_file());
    assert_eq!(gate.renderer().calls, vec![("1001".to_string(), CardVariant::Sign)]);
}

#[test]
fn sign_and_view_are_separate_cards() {
    let tmp = tempfile::tempdir().unwrap();
    let mut gate = CardGate::new(CardCache::new(tmp.path()), CountingRenderer::default(), noon(10));
    let alice = user("1001");

    let sign = gate
        .get_or_render(&alice, "alice", 2.5, Some(40), "gift", false, false)
        .unwrap();
    let view = gate
        .get_or_render(&alice, "alice", 0.0, Some(40), "", false, true)
        .unwrap();

    assert_ne!(sign, view);
    assert_eq!(gate.renderer().calls.len(), 2);
    assert_eq!(gate.renderer().calls[1].1, CardVariant::View);
}

#[test]
fn view_only_sentinel_reuses_existing_view_card() {
    let tmp = tempfile::tempdir().unwrap();
    let clock = noon(11);
    let date = clock.local().date_naive();
    let cache = CardCache::new(tmp.path());
    let existing = cache
        .put(
            &CardKey::new("2002", CardVariant::View, date),
            &RgbaImage::from_pixel(1, 1, Rgba([1, 1, 1, 255])),
        )
        .unwrap();
    let mut gate = CardGate::new(cache, CountingRenderer::default(), clock);

    // asks for a sign card, but the sentinel says nothing was signed
    let path = gate
        .get_or_render(&user("2002"), "bob", VIEW_ONLY_DELTA, None, "", false, false)
        .unwrap();

    assert_eq!(path, existing);
    assert!(gate.renderer().calls.is_empty());
}

#[test]
fn view_only_sentinel_forces_view_render() {
    let tmp = tempfile::tempdir().unwrap();
    let clock = noon(11);
    let date = clock.local().date_naive();
    let mut gate = CardGate::new(CardCache::new(tmp.path()), CountingRenderer::default(), clock);

    let path = gate
        .get_or_render(&user("2002"), "bob", VIEW_ONLY_DELTA, None, "", false, false)
        .unwrap();

    assert_eq!(path, tmp.path().join(format!("2002_view_{}.png", date)));
    assert_eq!(gate.renderer().calls, vec![("2002".to_string(), CardVariant::View)]);
    assert!(!tmp.path().join(format!("2002_sign_{}.png", date)).exists());

    // second sentinel call is a cache hit
    gate.get_or_render(&user("2002"), "bob", VIEW_ONLY_DELTA, None, "", false, false)
        .unwrap();
    assert_eq!(gate.renderer().calls.len(), 1);
}

#[test]
fn existing_sign_card_wins_over_sentinel() {
    let tmp = tempfile::tempdir().unwrap();
    let mut gate = CardGate::new(CardCache::new(tmp.path()), CountingRenderer::default(), noon(12));
    let carol = user("3003");

    let signed = gate
        .get_or_render(&carol, "carol", 1.0, Some(5), "gift", false, false)
        .unwrap();
    let again = gate
        .get_or_render(&carol, "carol", VIEW_ONLY_DELTA, Some(5), "", false, false)
        .unwrap();

    assert_eq!(signed, again);
    assert_eq!(gate.renderer().calls.len(), 1);
}

#[test]
fn next_day_sweep_drops_yesterdays_cards() {
    let tmp = tempfile::tempdir().unwrap();
    let yesterday = noon(13);
    let today = noon(14);
    let today_date = today.local().date_naive();

    let mut old_gate =
        CardGate::new(CardCache::new(tmp.path()), CountingRenderer::default(), yesterday);
    let old = old_gate
        .get_or_render(&user("4004"), "dan", 1.0, Some(1), "gift", false, false)
        .unwrap();

    let mut gate = CardGate::new(CardCache::new(tmp.path()), CountingRenderer::default(), today);
    let fresh = gate
        .get_or_render(&user("4004"), "dan", 1.0, Some(1), "gift", false, false)
        .unwrap();
    assert_ne!(old, fresh);
    assert_eq!(gate.renderer().calls.len(), 1, "yesterday's card must not be reused");

    let removed = gate.cache().sweep(today_date).unwrap();

    assert_eq!(removed, 1);
    assert!(!old.exists());
    assert!(fresh.is_file());
    assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
}
