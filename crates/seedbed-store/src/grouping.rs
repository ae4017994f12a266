use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use seedbed_core::dedup::{ContentClass, DedupIndex};
use seedbed_core::ids::{Fingerprint, PartitionId};
use seedbed_core::types::Holding;

use crate::fingerprint::fingerprint;

/// Group holdings into per-partition content equivalence classes.
///
/// Holdings sharing a fingerprint within one partition occupy the same
/// physical bytes and land in one class; equal fingerprints in different
/// partitions never share bytes and stay apart. A holding without a
/// manifest cannot be fingerprinted and becomes a singleton class.
pub fn group(holdings: &[Holding]) -> DedupIndex {
    let mut classes: BTreeMap<PartitionId, Vec<ContentClass>> = BTreeMap::new();
    let mut slots: HashMap<(PartitionId, Fingerprint), usize> = HashMap::new();

    for holding in holdings {
        let list = classes.entry(holding.partition.clone()).or_default();
        let Some(manifest) = &holding.manifest else {
            warn!(
                info_hash = %holding.info_hash,
                name = %holding.name,
                "no manifest, treating as singleton"
            );
            list.push(ContentClass {
                members: vec![holding.info_hash.clone()],
                bytes: holding.size,
            });
            continue;
        };

        let fp = fingerprint(manifest);
        let key = (holding.partition.clone(), fp);
        match slots.get(&key) {
            Some(&idx) => list[idx].members.push(holding.info_hash.clone()),
            None => {
                slots.insert(key, list.len());
                list.push(ContentClass {
                    members: vec![holding.info_hash.clone()],
                    bytes: holding.size,
                });
            }
        }
    }

    DedupIndex::from_classes(classes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedbed_core::ids::InfoHash;
    use seedbed_core::types::Manifest;

    fn holding(hash: &str, partition: &str, size: u64, manifest: Option<Manifest>) -> Holding {
        Holding {
            info_hash: InfoHash::new(hash),
            name: hash.to_owned(),
            site: "byr".into(),
            seed_id: 0,
            size,
            partition: PartitionId::new(partition),
            stats: None,
            manifest,
            activity: Default::default(),
        }
    }

    fn manifest(path: &str) -> Manifest {
        Manifest::new([Manifest::entry(path, 100)])
    }

    #[test]
    fn identical_manifests_share_a_class() {
        let holdings = vec![
            holding("h1", "p", 100, Some(manifest("a/x.mkv"))),
            holding("h2", "p", 100, Some(manifest("a/x.mkv"))),
            holding("h3", "p", 50, Some(manifest("b/y.mkv"))),
        ];
        let idx = group(&holdings);
        let p = PartitionId::new("p");
        assert_eq!(idx.classes(&p).len(), 2);
        assert_eq!(idx.classes(&p)[0].members.len(), 2);
        assert_eq!(idx.used_bytes(&p), 150);
    }

    #[test]
    fn partitions_never_share_classes() {
        let holdings = vec![
            holding("h1", "a", 100, Some(manifest("a/x.mkv"))),
            holding("h2", "b", 100, Some(manifest("a/x.mkv"))),
        ];
        let idx = group(&holdings);
        assert_eq!(idx.classes(&PartitionId::new("a")).len(), 1);
        assert_eq!(idx.classes(&PartitionId::new("b")).len(), 1);
        assert_eq!(idx.used_bytes(&PartitionId::new("a")), 100);
        assert_eq!(idx.used_bytes(&PartitionId::new("b")), 100);
    }

    #[test]
    fn missing_manifest_becomes_singleton() {
        let holdings = vec![
            holding("h1", "p", 100, None),
            holding("h2", "p", 100, None),
        ];
        let idx = group(&holdings);
        let p = PartitionId::new("p");
        // Without fingerprints the two cannot be proven identical.
        assert_eq!(idx.classes(&p).len(), 2);
        assert_eq!(idx.used_bytes(&p), 200);
    }

    #[test]
    fn separator_variants_group_together() {
        let holdings = vec![
            holding("h1", "p", 100, Some(manifest("a/x.mkv"))),
            holding("h2", "p", 100, Some(manifest("a\\x.mkv"))),
        ];
        let idx = group(&holdings);
        let p = PartitionId::new("p");
        assert_eq!(idx.classes(&p).len(), 1);
        assert_eq!(idx.classes(&p)[0].members.len(), 2);
    }

    #[test]
    fn class_order_follows_first_member() {
        let holdings = vec![
            holding("h3", "p", 10, Some(manifest("c"))),
            holding("h1", "p", 10, Some(manifest("a"))),
            holding("h2", "p", 10, Some(manifest("a"))),
        ];
        let idx = group(&holdings);
        let p = PartitionId::new("p");
        assert_eq!(idx.classes(&p)[0].members[0], InfoHash::new("h3"));
        assert_eq!(idx.classes(&p)[1].members, vec![InfoHash::new("h1"), InfoHash::new("h2")]);
    }
}
