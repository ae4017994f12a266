use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::PartitionConfig;
use crate::dedup::DedupIndex;
use crate::ids::{InfoHash, PartitionId};
use crate::scoring::PROTECTED;
use crate::types::{Candidate, Holding};

/// A candidate with its acquire score attached.
#[derive(Clone, Debug)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: f64,
}

/// A holding with its retain score attached; -1 marks it protected.
#[derive(Clone, Debug)]
pub struct ScoredHolding {
    pub holding: Holding,
    pub score: f64,
}

/// Capacity state of one partition after the preprocessing clamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionState {
    pub id: PartitionId,
    /// Capacity the plan may assume, never more than the filesystem holds.
    pub effective_cap: u64,
    /// Distinct bytes currently occupied by holdings.
    pub used: u64,
    /// Per-run acquisition budget in bytes.
    pub run_cap: u64,
}

impl PartitionState {
    /// Resolve a configured partition against observed usage and live free
    /// space. A configured cap of 0 means "use everything available"; a
    /// failed free-space query should be passed in as `free_disk = 0`.
    pub fn resolve(config: &PartitionConfig, used: u64, free_disk: u64) -> Self {
        let available = used.saturating_add(free_disk);
        let effective_cap = if config.capacity_cap > 0 {
            config.capacity_cap.min(available)
        } else {
            available
        };
        let run_cap = config.run_cap.unwrap_or(effective_cap / 50);
        Self {
            id: config.id.clone(),
            effective_cap,
            used,
            run_cap,
        }
    }
}

/// One holding marked for eviction.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Eviction {
    pub info_hash: InfoHash,
    pub partition: PartitionId,
}

/// One candidate placed into a partition.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Acquisition {
    pub candidate: Candidate,
    pub partition: PartitionId,
}

/// The computed evictions and acquisitions for one run. Produced once,
/// never merged across runs; executing it is the caller's job.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub evictions: Vec<Eviction>,
    pub acquisitions: Vec<Acquisition>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.evictions.is_empty() && self.acquisitions.is_empty()
    }
}

/// Derived per-class facts used during the sweep.
struct ClassMeta {
    retain_sum: f64,
    protected: bool,
    bytes: u64,
}

/// Monotonic sweep state of one partition.
struct Sweep {
    /// Indices into the holdings vec, ascending by retain score with
    /// protected holdings last.
    order: Vec<usize>,
    /// Advances only on commit; rejected holdings behind it are never
    /// reconsidered within the run.
    cursor: usize,
    /// Signed so an over-cap partition starts negative.
    headroom: i64,
    run_cap: u64,
    evicted: BTreeSet<usize>,
}

/// A feasible way to host a candidate in one partition.
enum Attempt {
    Headroom,
    Evict {
        end: usize,
        classes: Vec<usize>,
        reclaimed: u64,
        sacrificed: f64,
    },
}

impl Attempt {
    fn footprint(&self) -> (u64, f64) {
        match self {
            Attempt::Headroom => (0, 0.0),
            Attempt::Evict {
                reclaimed,
                sacrificed,
                ..
            } => (*reclaimed, *sacrificed),
        }
    }
}

impl Sweep {
    fn scan(
        &self,
        holdings: &[ScoredHolding],
        dedup: &DedupIndex,
        meta: &[ClassMeta],
        size: u64,
        score: f64,
    ) -> Option<Attempt> {
        if self.headroom >= size as i64 {
            return Some(Attempt::Headroom);
        }
        let mut sacrificed = 0.0;
        let mut reclaimed: u64 = 0;
        let mut picked: Vec<usize> = Vec::new();
        let mut pos = self.cursor;
        while pos < self.order.len() {
            let scored = &holdings[self.order[pos]];
            pos += 1;
            let Some((_, class_idx)) = dedup.class_of(&scored.holding.info_hash) else {
                continue;
            };
            let class = &meta[class_idx];
            // A protected class-mate keeps the bytes pinned; evicting the
            // rest of the class would free nothing.
            if class.protected {
                continue;
            }
            if self.evicted.contains(&class_idx) || picked.contains(&class_idx) {
                continue;
            }
            sacrificed += class.retain_sum;
            if sacrificed >= score {
                // Greedy exchange rule: never give up at least as much
                // value as the candidate brings.
                return None;
            }
            reclaimed += class.bytes;
            picked.push(class_idx);
            if self.headroom + reclaimed as i64 >= size as i64 {
                return Some(Attempt::Evict {
                    end: pos,
                    classes: picked,
                    reclaimed,
                    sacrificed,
                });
            }
        }
        None
    }
}

/// Compute the eviction/acquisition plan for one snapshot.
///
/// `partitions` is in configuration order, which doubles as the final
/// tie-break when several partitions could host a candidate. `dedup` must
/// be built over the same holdings. The computation is synchronous and
/// deterministic; re-planning an unchanged snapshot yields an identical
/// plan.
pub fn plan(
    partitions: &[PartitionState],
    holdings: Vec<ScoredHolding>,
    candidates: Vec<ScoredCandidate>,
    dedup: &DedupIndex,
) -> Plan {
    let holdings: Vec<ScoredHolding> = holdings
        .into_iter()
        .filter(|s| {
            if s.holding.size == 0 {
                warn!(info_hash = %s.holding.info_hash, name = %s.holding.name, "dropping zero-size holding");
                return false;
            }
            true
        })
        .collect();
    let mut candidates: Vec<ScoredCandidate> = candidates
        .into_iter()
        .filter(|s| {
            if s.candidate.size == 0 {
                warn!(site = %s.candidate.site, seed_id = s.candidate.seed_id, "dropping zero-size candidate");
                return false;
            }
            true
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.candidate.site.cmp(&b.candidate.site))
            .then_with(|| a.candidate.seed_id.cmp(&b.candidate.seed_id))
    });

    let scores: HashMap<&InfoHash, f64> = holdings
        .iter()
        .map(|s| (&s.holding.info_hash, s.score))
        .collect();

    let metas: Vec<Vec<ClassMeta>> = partitions
        .iter()
        .map(|p| {
            dedup
                .classes(&p.id)
                .iter()
                .map(|class| {
                    let mut retain_sum = 0.0;
                    let mut protected = false;
                    for member in &class.members {
                        match scores.get(member) {
                            Some(&s) if s == PROTECTED => protected = true,
                            Some(&s) => retain_sum += s,
                            None => {}
                        }
                    }
                    ClassMeta {
                        retain_sum,
                        protected,
                        bytes: class.bytes,
                    }
                })
                .collect()
        })
        .collect();

    let mut sweeps: Vec<Sweep> = partitions
        .iter()
        .map(|p| {
            let mut order: Vec<usize> = holdings
                .iter()
                .enumerate()
                .filter(|(_, s)| s.holding.partition == p.id)
                .map(|(i, _)| i)
                .collect();
            order.sort_by(|&a, &b| {
                let (sa, sb) = (&holdings[a], &holdings[b]);
                let (pa, pb) = (sa.score == PROTECTED, sb.score == PROTECTED);
                pa.cmp(&pb)
                    .then_with(|| sa.score.partial_cmp(&sb.score).unwrap_or(Ordering::Equal))
                    .then_with(|| sa.holding.info_hash.cmp(&sb.holding.info_hash))
            });
            Sweep {
                order,
                cursor: 0,
                headroom: p.effective_cap as i64 - p.used as i64,
                run_cap: p.run_cap,
                evicted: BTreeSet::new(),
            }
        })
        .collect();

    let mut out = Plan::default();
    let mut committed: u64 = 0;

    for scored in &candidates {
        if scored.score <= 0.0 {
            continue;
        }
        let size = scored.candidate.size;

        let mut best: Option<(usize, Attempt)> = None;
        for (pi, sweep) in sweeps.iter().enumerate() {
            if committed.saturating_add(size) > sweep.run_cap {
                continue;
            }
            let Some(attempt) = sweep.scan(&holdings, dedup, &metas[pi], size, scored.score)
            else {
                continue;
            };
            let better = match &best {
                None => true,
                Some((_, current)) => attempt.footprint() < current.footprint(),
            };
            if better {
                best = Some((pi, attempt));
            }
        }

        let Some((pi, attempt)) = best else {
            debug!(
                site = %scored.candidate.site,
                seed_id = scored.candidate.seed_id,
                "candidate not placeable in any partition"
            );
            continue;
        };

        let partition = &partitions[pi].id;
        let sweep = &mut sweeps[pi];
        match attempt {
            Attempt::Headroom => {
                sweep.headroom -= size as i64;
            }
            Attempt::Evict {
                end,
                classes,
                reclaimed,
                ..
            } => {
                for class_idx in classes {
                    sweep.evicted.insert(class_idx);
                    if let Some(class) = dedup.class(partition, class_idx) {
                        for member in &class.members {
                            out.evictions.push(Eviction {
                                info_hash: member.clone(),
                                partition: partition.clone(),
                            });
                        }
                    }
                }
                sweep.cursor = end;
                sweep.headroom += reclaimed as i64;
                sweep.headroom -= size as i64;
            }
        }
        committed += size;
        out.acquisitions.push(Acquisition {
            candidate: scored.candidate.clone(),
            partition: partition.clone(),
        });
    }

    out
}
