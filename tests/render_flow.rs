use std::cell::RefCell;
use std::fs;
use std::io::Cursor;
use std::rc::Rc;

use chrono::{DateTime, Local, TimeZone, Utc};
use image::{Rgba, RgbaImage};
use mockable::Clock;

use sign_card::assets::{startup, BAR_FILE, BAR_WHITE_FILE};
use sign_card::avatar::MemoryAvatars;
use sign_card::cache::CardCache;
use sign_card::config::CardConfig;
use sign_card::error::CardError;
use sign_card::gate::{CardGate, VIEW_ONLY_DELTA};
use sign_card::records::{MemoryRecords, SignUser};
use sign_card::render::{CardRenderer, CardRequest, ImageCardRenderer, CARD_HEIGHT, CARD_WIDTH};
use sign_card::types::CardVariant;

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

fn clock() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap())
}

fn records_with(users: &[(&str, f64)]) -> Rc<RefCell<MemoryRecords>> {
    let mut records = MemoryRecords::new();
    for (id, impression) in users {
        records.upsert_user(SignUser {
            impression: *impression,
            ..SignUser::new(*id, "qq")
        });
    }
    Rc::new(RefCell::new(records))
}

fn png(color: Rgba<u8>, w: u32, h: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    RgbaImage::from_pixel(w, h, color)
        .write_to(&mut out, image::ImageOutputFormat::Png)
        .unwrap();
    out.into_inner()
}

#[test]
fn startup_prepares_directories_and_sweeps() {
    let tmp = tempfile::tempdir().unwrap();
    let config = CardConfig::rooted_at(tmp.path());
    fs::create_dir_all(config.card_dir()).unwrap();
    fs::write(config.card_dir().join("1_sign_2020-01-01.png"), b"old").unwrap();

    let report = startup(&config, &clock()).unwrap();

    assert!(report.bars_generated);
    assert_eq!(report.cards_swept, 1);
    assert!(config.resource_dir().join(BAR_FILE).is_file());
    assert!(config.resource_dir().join(BAR_WHITE_FILE).is_file());

    let again = startup(&config, &clock()).unwrap();
    assert!(!again.bars_generated);
    assert_eq!(again.cards_swept, 0);
}

#[test]
fn renders_sign_card_without_font_or_background() {
    let tmp = tempfile::tempdir().unwrap();
    let config = CardConfig::rooted_at(tmp.path());
    startup(&config, &clock()).unwrap();

    let records = records_with(&[("5005", 60.0)]);
    let mut avatars = MemoryAvatars::new();
    avatars.insert("5005", png(Rgba([250, 0, 0, 255]), 64, 64));
    let mut renderer = ImageCardRenderer::new(config, records.clone(), avatars).unwrap();

    let user = records.borrow().user("5005").cloned().unwrap();
    let card = renderer
        .render(&CardRequest {
            user: &user,
            nickname: "eve",
            delta_impression: 3.2,
            gold: Some(25),
            gift: "一杯奶茶",
            is_double: false,
            variant: CardVariant::Sign,
            now: clock().local(),
        })
        .unwrap();

    assert_eq!(card.dimensions(), (CARD_WIDTH, CARD_HEIGHT));
    // avatar centre: panel top 150 + tile (25, 80) + avatar offset (19, 18) + half of 107
    let avatar_px = card.get_pixel(25 + 19 + 53, 150 + 80 + 18 + 53);
    assert!(avatar_px.0[0] > 200 && avatar_px.0[1] < 40, "got {:?}", avatar_px);
    // divider line
    assert_eq!(card.get_pixel(200, 150 + 100), &Rgba([0, 0, 0, 255]));
}

#[test]
fn progress_bar_fill_follows_affinity() {
    let tmp = tempfile::tempdir().unwrap();
    let config = CardConfig::rooted_at(tmp.path());
    startup(&config, &clock()).unwrap();

    // 5 of the 0..10 tier: half the 220px bar is coloured
    let records = records_with(&[("6006", 5.0)]);
    let mut renderer =
        ImageCardRenderer::new(config, records.clone(), MemoryAvatars::new()).unwrap();
    let user = records.borrow().user("6006").cloned().unwrap();
    let card = renderer
        .render(&CardRequest {
            user: &user,
            nickname: "fay",
            delta_impression: 1.0,
            gold: None,
            gift: "",
            is_double: false,
            variant: CardVariant::Sign,
            now: clock().local(),
        })
        .unwrap();

    let filled = card.get_pixel(225 + 60, 275 + 10);
    let empty = card.get_pixel(225 + 170, 275 + 10);
    assert_ne!(filled, &Rgba([255, 255, 255, 255]), "left half should be coloured");
    assert_eq!(empty, &Rgba([255, 255, 255, 255]), "right half should stay white");
}

#[test]
fn view_card_for_unknown_user_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let config = CardConfig::rooted_at(tmp.path());
    startup(&config, &clock()).unwrap();

    let records = records_with(&[]);
    let mut renderer = ImageCardRenderer::new(config, records, MemoryAvatars::new()).unwrap();
    let ghost = SignUser::new("ghost", "qq");
    let result = renderer.render(&CardRequest {
        user: &ghost,
        nickname: "ghost",
        delta_impression: VIEW_ONLY_DELTA,
        gold: None,
        gift: "",
        is_double: false,
        variant: CardVariant::View,
        now: clock().local(),
    });

    assert!(matches!(result, Err(CardError::UnknownUser(id)) if id == "ghost"));
}

#[test]
fn missing_bar_assets_surface_as_errors() {
    let tmp = tempfile::tempdir().unwrap();
    let config = CardConfig::rooted_at(tmp.path());

    let records = records_with(&[("7007", 1.0)]);
    let mut renderer =
        ImageCardRenderer::new(config, records.clone(), MemoryAvatars::new()).unwrap();
    let user = records.borrow().user("7007").cloned().unwrap();
    let result = renderer.render(&CardRequest {
        user: &user,
        nickname: "gus",
        delta_impression: 1.0,
        gold: Some(1),
        gift: "",
        is_double: false,
        variant: CardVariant::Sign,
        now: clock().local(),
    });

    assert!(result.is_err());
}

#[test]
fn gate_with_image_renderer_writes_decodable_png() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = CardConfig::rooted_at(tmp.path());
    config.bot_nickname = "Aqua".to_string();
    startup(&config, &clock()).unwrap();

    fs::create_dir_all(&config.background_dir).unwrap();
    fs::write(config.background_dir.join("bg.png"), png(Rgba([0, 90, 0, 255]), 10, 10)).unwrap();

    let records = records_with(&[("8008", 120.0), ("8009", 300.0)]);
    let cache = CardCache::new(config.card_dir());
    let renderer = ImageCardRenderer::new(config, records.clone(), MemoryAvatars::new()).unwrap();
    let mut gate = CardGate::new(cache, renderer, clock());

    let user = records.borrow().user("8008").cloned().unwrap();
    let path = gate
        .get_or_render(&user, "hana", VIEW_ONLY_DELTA, Some(900), "", false, true)
        .unwrap();

    let card = image::open(&path).unwrap().to_rgba8();
    assert_eq!(card.dimensions(), (CARD_WIDTH, CARD_HEIGHT));
    // top strip is plain background
    assert_eq!(card.get_pixel(800, 5), &Rgba([0, 90, 0, 255]));
}
