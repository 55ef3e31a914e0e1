use std::cell::RefCell;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use mockable::DefaultClock;
use tracing_subscriber::EnvFilter;

use sign_card::assets::startup;
use sign_card::avatar::NoAvatars;
use sign_card::cache::CardCache;
use sign_card::config::CardConfig;
use sign_card::error::CardError;
use sign_card::gate::{CardGate, VIEW_ONLY_DELTA};
use sign_card::level::resolve;
use sign_card::records::{MemoryRecords, SignUser};
use sign_card::render::ImageCardRenderer;
use sign_card::sign::{sign_in, SignOutcome};
use sign_card::types::today;

type Gate = CardGate<ImageCardRenderer<MemoryRecords, NoAvatars>, DefaultClock>;

struct Desk {
    gate: Gate,
    records: Rc<RefCell<MemoryRecords>>,
    records_path: Option<PathBuf>,
}

impl Desk {
    fn open(config: CardConfig, records_path: Option<PathBuf>) -> Result<Self, CardError> {
        let report = startup(&config, &DefaultClock)?;
        tracing::info!(
            bars_generated = report.bars_generated,
            cards_swept = report.cards_swept,
            "sign card resources ready"
        );

        let records = match &records_path {
            Some(path) if path.is_file() => MemoryRecords::load(path)?,
            _ => MemoryRecords::new(),
        };
        let records = Rc::new(RefCell::new(records));
        let cache = CardCache::new(config.card_dir());
        let renderer = ImageCardRenderer::new(config, records.clone(), NoAvatars)?;

        Ok(Self {
            gate: CardGate::new(cache, renderer, DefaultClock),
            records,
            records_path,
        })
    }

    fn persist(&self) {
        let Some(path) = &self.records_path else {
            return;
        };
        if let Err(e) = self.records.borrow().save(path) {
            eprintln!("saving records failed: {}", e);
        }
    }

    fn lookup(&self, user_id: &str) -> Option<SignUser> {
        let user = self.records.borrow().user(user_id).cloned();
        if user.is_none() {
            eprintln!("no such user {}", user_id);
        }
        user
    }

    fn cmd_user(&mut self, user_id: &str, platform: &str, impression: f64, uid: Option<u64>) {
        let mut user = self
            .records
            .borrow()
            .user(user_id)
            .cloned()
            .unwrap_or_else(|| SignUser::new(user_id, platform));
        user.platform = platform.to_string();
        user.impression = impression;
        user.console_uid = uid;
        self.records.borrow_mut().upsert_user(user);
        self.persist();
        println!("user {} set", user_id);
    }

    fn cmd_sign(&mut self, user_id: &str, delta: f64, gold: i64, is_double: bool, gift: &str) {
        let outcome = sign_in(
            &mut self.gate,
            &self.records,
            user_id,
            user_id,
            delta,
            gold,
            gift,
            is_double,
        );
        match outcome {
            Ok(SignOutcome::Signed(path)) => {
                self.persist();
                println!("card: {}", path.display());
            }
            Ok(SignOutcome::AlreadySigned(path)) => {
                println!("already signed today, card: {}", path.display());
            }
            Err(e) => {
                // a failed render may still follow a recorded sign
                self.persist();
                eprintln!("sign failed: {}", e);
            }
        }
    }

    fn cmd_view(&mut self, user_id: &str, gold: i64) {
        let Some(user) = self.lookup(user_id) else {
            return;
        };
        match self
            .gate
            .get_or_render(&user, user_id, VIEW_ONLY_DELTA, Some(gold), "", false, true)
        {
            Ok(path) => println!("card: {}", path.display()),
            Err(e) => eprintln!("render failed: {}", e),
        }
    }

    fn cmd_level(&self, impression: f64) {
        let standing = resolve(impression);
        let progress = standing.progress(impression);
        println!(
            "level {} (shown as {}) next={} previous={} missing={:.2} ratio={:.3}",
            standing.tier.label,
            progress.tier.label,
            standing.next_threshold,
            standing.previous_threshold,
            progress.interpolation,
            progress.ratio
        );
    }

    fn cmd_sweep(&self) {
        match self.gate.cache().sweep(today(&DefaultClock)) {
            Ok(n) => println!("removed {} stale cards", n),
            Err(e) => eprintln!("sweep failed: {}", e),
        }
    }
}

fn print_banner() {
    println!("Sign card REPL");
    println!("commands:");
    println!("  user ID PLATFORM IMPRESSION [CONSOLE_UID]");
    println!("  sign ID DELTA GOLD single|double GIFT...");
    println!("  view ID GOLD");
    println!("  level IMPRESSION");
    println!("  sweep");
    println!("  help");
    println!("  quit / exit");
    println!("—");
}

fn parse<T: std::str::FromStr>(what: &str, raw: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match raw.parse() {
        Ok(v) => Some(v),
        Err(e) => {
            eprintln!("bad {} {}: {}", what, raw, e);
            None
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "sign_card.json".to_string());
    let records_path = args.next().map(PathBuf::from);

    let config = match CardConfig::load(Path::new(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    let mut desk = match Desk::open(config, records_path) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("startup failed: {}", e);
            std::process::exit(1);
        }
    };

    let stdin = io::stdin();
    print_banner();

    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }

        let mut line = String::new();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(&cmd) = parts.first() else {
            continue;
        };

        match cmd {
            "quit" | "exit" => break,

            "help" => print_banner(),

            "user" => {
                if parts.len() != 4 && parts.len() != 5 {
                    eprintln!("usage: user ID PLATFORM IMPRESSION [CONSOLE_UID]");
                    continue;
                }
                let Some(impression) = parse::<f64>("IMPRESSION", parts[3]) else {
                    continue;
                };
                let uid = match parts.get(4) {
                    Some(raw) => match parse::<u64>("CONSOLE_UID", raw) {
                        Some(uid) => Some(uid),
                        None => continue,
                    },
                    None => None,
                };
                desk.cmd_user(parts[1], parts[2], impression, uid);
            }

            "sign" => {
                if parts.len() < 6 {
                    eprintln!("usage: sign ID DELTA GOLD single|double GIFT...");
                    continue;
                }
                let (Some(delta), Some(gold)) =
                    (parse::<f64>("DELTA", parts[2]), parse::<i64>("GOLD", parts[3]))
                else {
                    continue;
                };
                let is_double = match parts[4] {
                    "single" => false,
                    "double" => true,
                    other => {
                        eprintln!("expected single|double, got {}", other);
                        continue;
                    }
                };
                let gift = parts[5..].join(" ");
                desk.cmd_sign(parts[1], delta, gold, is_double, &gift);
            }

            "view" => {
                if parts.len() != 3 {
                    eprintln!("usage: view ID GOLD");
                    continue;
                }
                if let Some(gold) = parse::<i64>("GOLD", parts[2]) {
                    desk.cmd_view(parts[1], gold);
                }
            }

            "level" => {
                if parts.len() != 2 {
                    eprintln!("usage: level IMPRESSION");
                    continue;
                }
                if let Some(impression) = parse::<f64>("IMPRESSION", parts[1]) {
                    desk.cmd_level(impression);
                }
            }

            "sweep" => desk.cmd_sweep(),

            _ => {
                eprintln!("unknown command \"{}\"", cmd);
            }
        }
    }
}
