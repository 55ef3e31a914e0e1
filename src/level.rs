use std::sync::OnceLock;

/// One affinity tier: scores strictly above `threshold` (and not above the
/// next tier's threshold) belong to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tier {
    pub threshold: u32,
    pub label: &'static str,
    pub relation: &'static str,
    pub attitude: &'static str,
}

const fn tier(
    threshold: u32,
    label: &'static str,
    relation: &'static str,
    attitude: &'static str,
) -> Tier {
    Tier {
        threshold,
        label,
        relation,
        attitude,
    }
}

const STANDARD_TIERS: [Tier; 10] = [
    tier(9999, "9", "亲密", "恋人"),
    tier(400, "8", "亲密", "恋人"),
    tier(270, "7", "厚谊", "喜欢"),
    tier(200, "6", "相知", "可以分享小秘密"),
    tier(140, "5", "信赖", "好朋友"),
    tier(90, "4", "熟悉", "是个好人"),
    tier(50, "3", "普通", "一般"),
    tier(25, "2", "初识", "可以交流"),
    tier(10, "1", "陌生", "警惕"),
    tier(0, "0", "路人", "排斥"),
];

/// Ordered breakpoints from affinity score to level, highest first.
///
/// Thresholds are strictly decreasing and the last one is 0, so every
/// non-negative score has a tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdTable {
    tiers: Vec<Tier>,
}

/// Where a score sits in the table.
///
/// `next_threshold` is the upper bound of the tier (the threshold scanned just
/// before the one exceeded), `previous_threshold` its lower bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelStanding {
    pub tier: Tier,
    pub next_threshold: u32,
    pub previous_threshold: u32,
    /// The score is above the highest threshold.
    pub at_top: bool,
    /// Tier shown on the card; the top tier is displayed as the one below it.
    pub display_tier: Tier,
}

/// Display values derived from a standing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelProgress {
    pub tier: Tier,
    /// Score still missing to reach the next level; 0 at the top.
    pub interpolation: f64,
    /// Progress-bar fill ratio.
    pub ratio: f64,
}

impl ThresholdTable {
    /// Returns `None` unless thresholds strictly decrease down to 0 and there
    /// are at least two tiers.
    pub fn new(tiers: Vec<Tier>) -> Option<Self> {
        if tiers.len() < 2 || tiers.last().map(|t| t.threshold) != Some(0) {
            return None;
        }
        if tiers.windows(2).any(|w| w[0].threshold <= w[1].threshold) {
            return None;
        }
        Some(Self { tiers })
    }

    /// The bot's table, built once per process.
    pub fn standard() -> &'static ThresholdTable {
        static TABLE: OnceLock<ThresholdTable> = OnceLock::new();
        TABLE.get_or_init(|| ThresholdTable {
            tiers: STANDARD_TIERS.to_vec(),
        })
    }

    pub fn resolve(&self, impression: f64) -> LevelStanding {
        if impression == 0.0 {
            return self.floor_standing();
        }
        for (i, tier) in self.tiers.iter().enumerate() {
            if impression > f64::from(tier.threshold) {
                // index 0 wraps to the last entry
                let above = if i == 0 {
                    self.lowest()
                } else {
                    self.tiers[i - 1]
                };
                let at_top = i == 0;
                return LevelStanding {
                    tier: *tier,
                    next_threshold: above.threshold,
                    previous_threshold: tier.threshold,
                    at_top,
                    display_tier: if at_top { self.tiers[1] } else { *tier },
                };
            }
        }
        self.floor_standing()
    }

    fn lowest(&self) -> Tier {
        self.tiers[self.tiers.len() - 1]
    }

    // Zero (and anything below the table) sits on the floor tier with the
    // first step above it as the next target.
    fn floor_standing(&self) -> LevelStanding {
        let floor = self.lowest();
        LevelStanding {
            tier: floor,
            next_threshold: self.tiers[self.tiers.len() - 2].threshold,
            previous_threshold: floor.threshold,
            at_top: false,
            display_tier: floor,
        }
    }
}

impl LevelStanding {
    pub fn progress(&self, impression: f64) -> LevelProgress {
        let next = f64::from(self.next_threshold);
        let previous = f64::from(self.previous_threshold);
        let interpolation = if self.at_top { 0.0 } else { next - impression };
        let ratio = if self.next_threshold == 0 {
            0.0
        } else {
            1.0 - (next - impression) / (next - previous)
        };
        LevelProgress {
            tier: self.display_tier,
            interpolation,
            ratio,
        }
    }

    /// `(label, next_threshold, previous_threshold)`
    pub fn as_tuple(&self) -> (&'static str, u32, u32) {
        (self.tier.label, self.next_threshold, self.previous_threshold)
    }
}

/// Resolve against the standard table.
pub fn resolve(impression: f64) -> LevelStanding {
    ThresholdTable::standard().resolve(impression)
}
