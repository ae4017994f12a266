use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::ids::{InfoHash, PartitionId};

/// Holdings in one partition occupying the same physical bytes.
///
/// Space accounting charges `bytes` once per class, however many members
/// it has (hardlinked or duplicate-seeded content).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentClass {
    pub members: Vec<InfoHash>,
    pub bytes: u64,
}

/// Per-partition content equivalence classes with a member lookup.
///
/// Built by the store's grouping pass; the planner only reads it.
/// Iteration order is deterministic: partitions by id, classes in
/// first-member insertion order.
#[derive(Clone, Debug, Default)]
pub struct DedupIndex {
    classes: BTreeMap<PartitionId, Vec<ContentClass>>,
    lookup: HashMap<InfoHash, (PartitionId, usize)>,
}

impl DedupIndex {
    pub fn from_classes(classes: BTreeMap<PartitionId, Vec<ContentClass>>) -> Self {
        let mut lookup = HashMap::new();
        for (partition, list) in &classes {
            for (idx, class) in list.iter().enumerate() {
                for member in &class.members {
                    lookup.insert(member.clone(), (partition.clone(), idx));
                }
            }
        }
        Self { classes, lookup }
    }

    /// Classes of one partition; empty when the partition holds nothing.
    pub fn classes(&self, partition: &PartitionId) -> &[ContentClass] {
        self.classes.get(partition).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Partition and class index of a holding.
    pub fn class_of(&self, info_hash: &InfoHash) -> Option<(&PartitionId, usize)> {
        self.lookup.get(info_hash).map(|(p, i)| (p, *i))
    }

    pub fn class(&self, partition: &PartitionId, idx: usize) -> Option<&ContentClass> {
        self.classes.get(partition)?.get(idx)
    }

    /// Distinct-fingerprint byte usage of one partition: each class
    /// contributes its size exactly once.
    pub fn used_bytes(&self, partition: &PartitionId) -> u64 {
        self.classes(partition).iter().map(|c| c.bytes).sum()
    }

    pub fn partitions(&self) -> impl Iterator<Item = &PartitionId> {
        self.classes.keys()
    }
}
