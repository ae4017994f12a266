use chrono::{DateTime, Utc};
use tracing::debug;

use seedbed_core::types::{Candidate, Holding, PromotionSet};

/// Derive best-effort swarm statistics for a holding the catalog did not
/// report, from what the client itself observed.
///
/// Seeders and leechers come from the observed peer counts, age from the
/// last transfer activity. The completed-download count is unknowable from
/// the client side and stays 0, and no promotions are assumed. Returns None
/// when the client never saw any activity, in which case the holding keeps
/// its protected status.
pub fn estimate_stats(holding: &Holding, now: DateTime<Utc>) -> Option<Candidate> {
    let last_activity = holding.activity.last_activity?;
    let age_days = (now - last_activity).num_seconds().max(0) as f64 / 86_400.0;
    Some(Candidate {
        site: holding.site.clone(),
        seed_id: holding.seed_id,
        title: holding.name.clone(),
        size: holding.size,
        seeders: holding.activity.complete_peers,
        leechers: holding.activity.incomplete_peers,
        finished: 0,
        age_days,
        promotions: PromotionSet::none(),
    })
}

/// Fill in estimated statistics for holdings that have none.
pub fn backfill_stats(holdings: &mut [Holding], now: DateTime<Utc>) {
    let mut estimated = 0;
    for holding in holdings.iter_mut() {
        if holding.stats.is_none() {
            if let Some(stats) = estimate_stats(holding, now) {
                holding.stats = Some(stats);
                estimated += 1;
            }
        }
    }
    if estimated > 0 {
        debug!(estimated, "filled missing statistics from client state");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use seedbed_core::ids::{InfoHash, PartitionId};
    use seedbed_core::types::Activity;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn holding(activity: Activity) -> Holding {
        Holding {
            info_hash: InfoHash::new("aa"),
            name: "some release".into(),
            site: "byr".into(),
            seed_id: 42,
            size: 5_000_000_000,
            partition: PartitionId::new("p"),
            stats: None,
            manifest: None,
            activity,
        }
    }

    #[test]
    fn estimate_uses_observed_peers_and_age() {
        let h = holding(Activity {
            complete_peers: 4,
            incomplete_peers: 9,
            last_activity: Some(Utc.with_ymd_and_hms(2026, 2, 26, 12, 0, 0).unwrap()),
            ..Default::default()
        });
        let stats = estimate_stats(&h, now()).unwrap();
        assert_eq!(stats.seeders, 4);
        assert_eq!(stats.leechers, 9);
        assert_eq!(stats.finished, 0);
        assert!((stats.age_days - 3.0).abs() < 1e-9);
        assert_eq!(stats.site, "byr");
        assert_eq!(stats.seed_id, 42);
        assert_eq!(stats.size, 5_000_000_000);
    }

    #[test]
    fn no_activity_yields_nothing() {
        let h = holding(Activity::default());
        assert!(estimate_stats(&h, now()).is_none());
    }

    #[test]
    fn future_activity_clamps_to_zero_age() {
        let h = holding(Activity {
            last_activity: Some(Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()),
            ..Default::default()
        });
        let stats = estimate_stats(&h, now()).unwrap();
        assert_eq!(stats.age_days, 0.0);
    }

    #[test]
    fn backfill_skips_holdings_with_stats() {
        let reported = Candidate {
            site: "byr".into(),
            seed_id: 42,
            title: "some release".into(),
            size: 5_000_000_000,
            seeders: 100,
            leechers: 1,
            finished: 7,
            age_days: 2.0,
            promotions: PromotionSet::none(),
        };
        let mut holdings = vec![
            holding(Activity {
                last_activity: Some(now()),
                ..Default::default()
            }),
            holding(Activity::default()),
        ];
        holdings[0].stats = Some(reported.clone());

        backfill_stats(&mut holdings, now());
        // Reported stats win over estimates.
        assert_eq!(holdings[0].stats.as_ref().unwrap().seeders, 100);
        assert_eq!(holdings[0].stats, Some(reported));
        // Nothing to estimate from.
        assert!(holdings[1].stats.is_none());
    }

    #[test]
    fn backfill_fills_from_activity() {
        let mut holdings = vec![holding(Activity {
            complete_peers: 2,
            last_activity: Some(now()),
            ..Default::default()
        })];
        backfill_stats(&mut holdings, now());
        assert_eq!(holdings[0].stats.as_ref().unwrap().seeders, 2);
    }
}
