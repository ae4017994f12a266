use chrono::{DateTime, Utc};

use crate::config::ScoringConfig;
use crate::types::{Candidate, Holding, Promotion};

/// Upload rate above which a holding counts as actively useful.
const UPLOAD_RATE_FLOOR: u64 = 5 * 1024;

/// Retain score marking a holding as never evictable.
pub const PROTECTED: f64 = -1.0;

const GB: f64 = 1_000_000_000.0;

/// Confidence in a listing by leecher count. Very few leechers is risky,
/// a moderate swarm is ideal, saturating above ten.
const LEECHER_WEIGHTS: [(f64, f64); 4] = [(0.0, 0.1), (2.0, 0.6), (6.0, 0.9), (10.0, 1.0)];

/// Size preference: tiny items barely move the ratio, mid-size is ideal,
/// very large items tie up space for too long.
const SIZE_WEIGHTS: [(f64, f64); 5] = [
    (0.0, 0.1),
    (2.0, 1.0),
    (15.0, 1.0),
    (60.0, 0.1),
    (500.0, 0.01),
];

/// Discount tags in precedence order; only the first match applies.
const DISCOUNTS: [(Promotion, f64); 3] = [
    (Promotion::Free, 1.0),
    (Promotion::HalfDown, 0.5),
    (Promotion::ThirtyDown, 0.7),
];

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Clamped linear interpolation over points with ascending x-coordinates.
pub(crate) fn piecewise_linear(points: &[(f64, f64)], x: f64) -> f64 {
    match points.iter().position(|&(px, _)| x < px) {
        Some(0) => points[0].1,
        Some(i) => {
            let (x0, y0) = points[i - 1];
            let (x1, y1) = points[i];
            y0 + (x - x0) / (x1 - x0) * (y1 - y0)
        }
        None => points[points.len() - 1].1,
    }
}

/// Values candidates for acquisition and holdings for retention.
///
/// Pure: all inputs are explicit, including `now` for grace-window checks.
#[derive(Clone, Debug)]
pub struct Scorer {
    config: ScoringConfig,
}

impl Scorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Value of acquiring a candidate, in [0, inf).
    pub fn score_acquire(&self, candidate: &Candidate) -> f64 {
        self.score(candidate, true)
    }

    /// Value of keeping a holding: -1 means protected, otherwise the
    /// acquire value of its statistics snapshot with the cost-recovery
    /// cutoff disabled.
    pub fn score_retain(&self, holding: &Holding, now: DateTime<Utc>) -> f64 {
        let activity = &holding.activity;
        if activity.upload_rate > UPLOAD_RATE_FLOOR {
            return PROTECTED;
        }
        if activity.remaining > 0 {
            return PROTECTED;
        }
        if let Some(finished_at) = activity.finished_at {
            let days = (now - finished_at).num_seconds() as f64 / 86_400.0;
            if days < self.config.retention_grace_days {
                return PROTECTED;
            }
        }
        let Some(stats) = &holding.stats else {
            return PROTECTED;
        };
        if stats.seeders <= 1 {
            return PROTECTED;
        }
        self.score(stats, false)
    }

    fn score(&self, candidate: &Candidate, check_cost_recovery: bool) -> f64 {
        if candidate.seeders == 0 || candidate.leechers == 0 {
            return 0.0;
        }
        let seeders = f64::from(candidate.seeders);
        let leechers = f64::from(candidate.leechers);
        let finished = f64::from(candidate.finished);
        let age = candidate.age_days;

        let finished_ratio = 0.5 * sigmoid(30.0 - age) + 0.5;
        let mut value = ((finished_ratio * finished + 1.5 * leechers) / (age + 2.0) + leechers)
            / (seeders + leechers + 1.0);
        value *= piecewise_linear(&LEECHER_WEIGHTS, leechers);

        if candidate.promotions.contains(Promotion::TwoUp) {
            value *= 2.0;
        }
        for (tag, discount) in DISCOUNTS {
            if candidate.promotions.contains(tag) {
                value *= 1.0 + self.config.free_weight * discount;
                break;
            }
        }

        let size_gb = candidate.size as f64 / GB;
        let size_ratio = sigmoid((finished_ratio + finished) / (age + 1.0) - 20.0);
        value *= (1.0 - size_ratio) * piecewise_linear(&SIZE_WEIGHTS, size_gb) + size_ratio;

        if check_cost_recovery && value < 1.0 / self.config.cost_recovery_days {
            return 0.0;
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{InfoHash, PartitionId};
    use crate::types::{Activity, PromotionSet};
    use chrono::TimeZone;

    fn candidate(seeders: u32, leechers: u32, finished: u32, age_days: f64, size: u64) -> Candidate {
        Candidate {
            site: "byr".into(),
            seed_id: 1,
            title: "t".into(),
            size,
            seeders,
            leechers,
            finished,
            age_days,
            promotions: PromotionSet::none(),
        }
    }

    fn holding(stats: Option<Candidate>, activity: Activity) -> Holding {
        Holding {
            info_hash: InfoHash::new("aa"),
            name: "t".into(),
            site: "byr".into(),
            seed_id: 1,
            size: 5_000_000_000,
            partition: PartitionId::new("p"),
            stats,
            manifest: None,
            activity,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn scorer() -> Scorer {
        Scorer::new(ScoringConfig::default())
    }

    #[test]
    fn sigmoid_midpoint_and_saturation() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(40.0) > 0.999_999);
        assert!(sigmoid(-40.0) < 1e-6);
    }

    #[test]
    fn piecewise_clamps_at_endpoints() {
        assert_eq!(piecewise_linear(&LEECHER_WEIGHTS, -5.0), 0.1);
        assert_eq!(piecewise_linear(&LEECHER_WEIGHTS, 999.0), 1.0);
    }

    #[test]
    fn piecewise_interpolates_midpoints() {
        // halfway between (0, 0.1) and (2, 0.6)
        assert!((piecewise_linear(&LEECHER_WEIGHTS, 1.0) - 0.35).abs() < 1e-12);
        // halfway between (15, 1.0) and (60, 0.1) is at 37.5
        assert!((piecewise_linear(&SIZE_WEIGHTS, 37.5) - 0.55).abs() < 1e-12);
    }

    #[test]
    fn piecewise_exact_knots() {
        assert!((piecewise_linear(&SIZE_WEIGHTS, 2.0) - 1.0).abs() < 1e-12);
        assert!((piecewise_linear(&SIZE_WEIGHTS, 15.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn no_seeders_scores_zero() {
        let s = scorer();
        assert_eq!(s.score_acquire(&candidate(0, 10, 100, 1.0, 5_000_000_000)), 0.0);
    }

    #[test]
    fn no_leechers_scores_zero() {
        let s = scorer();
        assert_eq!(s.score_acquire(&candidate(5, 0, 100, 1.0, 5_000_000_000)), 0.0);
    }

    #[test]
    fn healthy_swarm_scores_positive() {
        let s = scorer();
        let v = s.score_acquire(&candidate(1, 10, 100, 1.0, 5_000_000_000));
        assert!(v > 0.0, "got: {v}");
    }

    #[test]
    fn two_up_doubles() {
        let s = scorer();
        let base = candidate(1, 10, 100, 1.0, 5_000_000_000);
        let mut boosted = base.clone();
        boosted.promotions = PromotionSet::new([Promotion::TwoUp]);
        let ratio = s.score_acquire(&boosted) / s.score_acquire(&base);
        assert!((ratio - 2.0).abs() < 1e-9, "got: {ratio}");
    }

    #[test]
    fn free_discount_applies() {
        let s = scorer();
        let base = candidate(1, 10, 100, 1.0, 5_000_000_000);
        let mut free = base.clone();
        free.promotions = PromotionSet::new([Promotion::Free]);
        let ratio = s.score_acquire(&free) / s.score_acquire(&base);
        assert!((ratio - 2.0).abs() < 1e-9, "got: {ratio}");
    }

    #[test]
    fn half_down_discount_applies() {
        let s = scorer();
        let base = candidate(1, 10, 100, 1.0, 5_000_000_000);
        let mut half = base.clone();
        half.promotions = PromotionSet::new([Promotion::HalfDown]);
        let ratio = s.score_acquire(&half) / s.score_acquire(&base);
        assert!((ratio - 1.5).abs() < 1e-9, "got: {ratio}");
    }

    #[test]
    fn free_takes_precedence_over_half_down() {
        let s = scorer();
        let base = candidate(1, 10, 100, 1.0, 5_000_000_000);
        let mut both = base.clone();
        both.promotions = PromotionSet::new([Promotion::HalfDown, Promotion::Free]);
        let ratio = s.score_acquire(&both) / s.score_acquire(&base);
        assert!((ratio - 2.0).abs() < 1e-9, "got: {ratio}");
    }

    #[test]
    fn cost_recovery_cutoff_zeroes_weak_candidates() {
        let s = scorer();
        // Old, oversupplied, barely any demand.
        let weak = candidate(100, 1, 0, 100.0, 30_000_000_000);
        assert_eq!(s.score_acquire(&weak), 0.0);
    }

    #[test]
    fn retain_skips_cost_recovery_cutoff() {
        let s = scorer();
        let weak = candidate(100, 1, 0, 100.0, 30_000_000_000);
        let h = holding(Some(weak), Activity::default());
        let v = s.score_retain(&h, now());
        assert!(v > 0.0, "got: {v}");
    }

    #[test]
    fn fast_uploader_protected() {
        let s = scorer();
        let h = holding(
            Some(candidate(5, 5, 10, 20.0, 5_000_000_000)),
            Activity {
                upload_rate: 6 * 1024,
                ..Default::default()
            },
        );
        assert_eq!(s.score_retain(&h, now()), PROTECTED);
    }

    #[test]
    fn slow_uploader_not_protected() {
        let s = scorer();
        let h = holding(
            Some(candidate(5, 5, 10, 20.0, 5_000_000_000)),
            Activity {
                upload_rate: 5 * 1024,
                ..Default::default()
            },
        );
        assert!(s.score_retain(&h, now()) >= 0.0);
    }

    #[test]
    fn incomplete_protected() {
        let s = scorer();
        let h = holding(
            Some(candidate(5, 5, 10, 20.0, 5_000_000_000)),
            Activity {
                remaining: 1,
                ..Default::default()
            },
        );
        assert_eq!(s.score_retain(&h, now()), PROTECTED);
    }

    #[test]
    fn within_grace_window_protected() {
        let s = scorer();
        let h = holding(
            Some(candidate(5, 5, 10, 20.0, 5_000_000_000)),
            Activity {
                finished_at: Some(now() - chrono::Duration::days(3)),
                ..Default::default()
            },
        );
        assert_eq!(s.score_retain(&h, now()), PROTECTED);
    }

    #[test]
    fn past_grace_window_not_protected() {
        let s = scorer();
        let h = holding(
            Some(candidate(5, 5, 10, 20.0, 5_000_000_000)),
            Activity {
                finished_at: Some(now() - chrono::Duration::days(16)),
                ..Default::default()
            },
        );
        assert!(s.score_retain(&h, now()) >= 0.0);
    }

    #[test]
    fn missing_stats_protected() {
        let s = scorer();
        let h = holding(None, Activity::default());
        assert_eq!(s.score_retain(&h, now()), PROTECTED);
    }

    #[test]
    fn last_copy_protected() {
        let s = scorer();
        let h = holding(Some(candidate(1, 5, 10, 20.0, 5_000_000_000)), Activity::default());
        assert_eq!(s.score_retain(&h, now()), PROTECTED);
    }
}
