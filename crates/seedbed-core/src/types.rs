use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{InfoHash, PartitionId};

/// Promotion tags a tracker may attach to a listing.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Promotion {
    /// Download does not count against the account.
    Free,
    /// Download counts at half rate.
    HalfDown,
    /// Download counts at 30% off.
    ThirtyDown,
    /// Upload counts double.
    TwoUp,
}

/// Set of promotion tags carried by one listing.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PromotionSet(Vec<Promotion>);

impl PromotionSet {
    pub fn new(tags: impl Into<Vec<Promotion>>) -> Self {
        Self(tags.into())
    }

    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn contains(&self, tag: Promotion) -> bool {
        self.0.contains(&tag)
    }
}

/// A remotely discoverable acquisition candidate, constructed fresh each run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    /// Originating tracker, part of the unique identity with `seed_id`.
    pub site: String,
    /// Numeric catalog id on that tracker.
    pub seed_id: u64,
    pub title: String,
    pub size: u64,
    pub seeders: u32,
    pub leechers: u32,
    /// Completed-download count reported by the tracker.
    pub finished: u32,
    /// Days since the listing first appeared.
    pub age_days: f64,
    pub promotions: PromotionSet,
}

/// One file of a transfer: relative path and byte size.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestEntry {
    pub path: String,
    pub size: u64,
}

/// File manifest of a transfer, input to fingerprinting.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Manifest(Vec<ManifestEntry>);

impl Manifest {
    pub fn new(entries: impl Into<Vec<ManifestEntry>>) -> Self {
        Self(entries.into())
    }

    pub fn entry(path: impl Into<String>, size: u64) -> ManifestEntry {
        ManifestEntry {
            path: path.into(),
            size,
        }
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Live activity of a holding, read from the seeding client at run start.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Activity {
    /// Current upload rate in bytes per second.
    pub upload_rate: u64,
    /// Bytes still to download; 0 means the transfer is complete.
    pub remaining: u64,
    /// When the download finished, if the client recorded it.
    pub finished_at: Option<DateTime<Utc>>,
    /// Peers observed with the complete payload.
    pub complete_peers: u32,
    /// Peers observed still downloading.
    pub incomplete_peers: u32,
    /// Most recent transfer activity, used to estimate age when the
    /// catalog never reported this content.
    pub last_activity: Option<DateTime<Utc>>,
}

/// A locally present instance of previously acquired content.
/// Read-only input; the planner never mutates holdings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Holding {
    pub info_hash: InfoHash,
    pub name: String,
    /// Originating tracker; empty when the client has no record of it.
    pub site: String,
    /// Catalog id on the originating tracker; 0 when unknown.
    pub seed_id: u64,
    pub size: u64,
    pub partition: PartitionId,
    /// Best-effort swarm statistics; absent when neither the catalog nor
    /// the client could supply them.
    pub stats: Option<Candidate>,
    /// File manifest; absent when the client cannot produce one.
    pub manifest: Option<Manifest>,
    pub activity: Activity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion_set_contains() {
        let set = PromotionSet::new([Promotion::Free, Promotion::TwoUp]);
        assert!(set.contains(Promotion::Free));
        assert!(set.contains(Promotion::TwoUp));
        assert!(!set.contains(Promotion::HalfDown));
    }

    #[test]
    fn empty_promotion_set() {
        let set = PromotionSet::none();
        assert!(!set.contains(Promotion::Free));
    }

    #[test]
    fn candidate_serde_roundtrip() {
        let c = Candidate {
            site: "byr".into(),
            seed_id: 42,
            title: "some release".into(),
            size: 7_000_000_000,
            seeders: 3,
            leechers: 8,
            finished: 120,
            age_days: 1.5,
            promotions: PromotionSet::new([Promotion::Free]),
        };
        let json = serde_json::to_string(&c).unwrap();
        let parsed: Candidate = serde_json::from_str(&json).unwrap();
        assert_eq!(c, parsed);
    }

    #[test]
    fn manifest_entries_accessible() {
        let m = Manifest::new([
            Manifest::entry("a/b.mkv", 100),
            Manifest::entry("a/c.nfo", 5),
        ]);
        assert_eq!(m.entries().len(), 2);
        assert_eq!(m.entries()[0].path, "a/b.mkv");
        assert!(!m.is_empty());
    }
}
