use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn, Instrument};

use seedbed_core::config::{validate_partitions, PartitionConfig, ScoringConfig};
use seedbed_core::dedup::DedupIndex;
use seedbed_core::ids::{InfoHash, PartitionId, RunId};
use seedbed_core::planning::{plan, PartitionState, Plan, ScoredCandidate, ScoredHolding};
use seedbed_core::scoring::Scorer;
use seedbed_core::types::{Candidate, Holding, Promotion};
use seedbed_store::{fingerprint, group, TorrentRepo};

use crate::error::EngineError;
use crate::snapshot;
use crate::traits::{Catalog, DiskProbe, SeedClient};

/// Options for one planning run.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Only consider candidates carrying the Free tag.
    pub free_only: bool,
    /// Plan a single explicit listing instead of the catalog, lifting the
    /// per-run acquisition caps and the greedy exchange limit.
    pub target: Option<Candidate>,
}

/// Byte movement of one partition implied by the plan.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpaceChange {
    pub before: u64,
    pub evicted: u64,
    pub acquired: u64,
    pub after: u64,
}

/// Everything one run produced. Executing the plan is the caller's job.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub plan: Plan,
    pub spaces: BTreeMap<PartitionId, SpaceChange>,
    /// Candidates whose content is already held under another site; the
    /// executor can cross-seed the existing bytes instead of downloading.
    pub duplicates: Vec<(Candidate, InfoHash)>,
}

/// Wires the collaborators, the store and the planner into runs.
pub struct Engine {
    catalog: Arc<dyn Catalog>,
    client: Arc<dyn SeedClient>,
    probe: Arc<dyn DiskProbe>,
    repo: TorrentRepo,
    partitions: Vec<PartitionConfig>,
    scorer: Scorer,
}

impl Engine {
    /// Construct an engine over validated configuration. Configuration
    /// problems surface here, never mid-run.
    pub fn new(
        catalog: Arc<dyn Catalog>,
        client: Arc<dyn SeedClient>,
        probe: Arc<dyn DiskProbe>,
        repo: TorrentRepo,
        partitions: Vec<PartitionConfig>,
        scoring: ScoringConfig,
    ) -> Result<Self, EngineError> {
        validate_partitions(&partitions)?;
        scoring.validate()?;
        Ok(Self {
            catalog,
            client,
            probe,
            repo,
            partitions,
            scorer: Scorer::new(scoring),
        })
    }

    /// Compute the eviction/acquisition plan for the current snapshot.
    pub async fn plan_run(&self, options: RunOptions) -> Result<RunReport, EngineError> {
        let run_id = RunId::new();
        let span = info_span!("plan_run", run_id = %run_id);
        self.plan_snapshot(run_id, options).instrument(span).await
    }

    async fn plan_snapshot(
        &self,
        run_id: RunId,
        options: RunOptions,
    ) -> Result<RunReport, EngineError> {
        let now = Utc::now();

        let mut holdings = self.client.holdings().await?;
        snapshot::backfill_stats(&mut holdings, now);

        let inserted = self.repo.ensure_known(&holdings);
        if inserted > 0 {
            info!(inserted, "registered new holdings");
        }

        let (candidates, duplicates) = match &options.target {
            Some(target) => {
                let scored = ScoredCandidate {
                    candidate: target.clone(),
                    score: f64::INFINITY,
                };
                (vec![scored], Vec::new())
            }
            None => {
                let listings = self.catalog.fetch_catalog().await?;
                let fetched = listings.len();

                let held: HashSet<(&str, u64)> = holdings
                    .iter()
                    .filter(|h| !h.site.is_empty() && h.seed_id != 0)
                    .map(|h| (h.site.as_str(), h.seed_id))
                    .collect();
                let mut fresh: Vec<Candidate> = listings
                    .into_iter()
                    .filter(|c| !held.contains(&(c.site.as_str(), c.seed_id)))
                    .collect();
                if options.free_only {
                    fresh.retain(|c| c.promotions.contains(Promotion::Free));
                }

                let (fresh, duplicates) = self.split_duplicates(fresh, &holdings).await;
                info!(
                    fetched,
                    planned = fresh.len(),
                    duplicates = duplicates.len(),
                    "candidate listings filtered"
                );

                let scored = fresh
                    .into_iter()
                    .map(|candidate| {
                        let score = self.scorer.score_acquire(&candidate);
                        ScoredCandidate { candidate, score }
                    })
                    .collect();
                (scored, duplicates)
            }
        };

        let scored_holdings: Vec<ScoredHolding> = holdings
            .iter()
            .map(|h| ScoredHolding {
                holding: h.clone(),
                score: self.scorer.score_retain(h, now),
            })
            .collect();

        let dedup = group(&holdings);

        let target_mode = options.target.is_some();
        let mut states = Vec::with_capacity(self.partitions.len());
        for config in &self.partitions {
            let used = dedup.used_bytes(&config.id);
            let free = match self.probe.free_space(&config.root) {
                Some(free) => free,
                None => {
                    warn!(
                        partition = %config.id,
                        root = %config.root.display(),
                        "free-space query failed, assuming none"
                    );
                    0
                }
            };
            let mut state = PartitionState::resolve(config, used, free);
            if target_mode {
                state.run_cap = u64::MAX;
            }
            states.push(state);
        }

        let plan = plan(&states, scored_holdings, candidates, &dedup);
        let spaces = space_changes(&states, &plan, &dedup);
        info!(
            evictions = plan.evictions.len(),
            acquisitions = plan.acquisitions.len(),
            "plan computed"
        );

        Ok(RunReport {
            run_id,
            plan,
            spaces,
            duplicates,
        })
    }

    /// Split off candidates whose fingerprint is already registered for a
    /// different site with the content still held. A failed manifest fetch
    /// or store lookup leaves the candidate in the planning pool.
    async fn split_duplicates(
        &self,
        candidates: Vec<Candidate>,
        holdings: &[Holding],
    ) -> (Vec<Candidate>, Vec<(Candidate, InfoHash)>) {
        let held: HashSet<&InfoHash> = holdings.iter().map(|h| &h.info_hash).collect();
        let mut fresh = Vec::with_capacity(candidates.len());
        let mut duplicates = Vec::new();

        for candidate in candidates {
            let manifest = match self
                .catalog
                .fetch_manifest(&candidate.site, candidate.seed_id)
                .await
            {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!(
                        site = %candidate.site,
                        seed_id = candidate.seed_id,
                        error = %e,
                        "manifest fetch failed, duplicate check skipped"
                    );
                    fresh.push(candidate);
                    continue;
                }
            };
            let fp = fingerprint(&manifest);
            let records = match self.repo.find_by_fingerprint(&fp) {
                Ok(records) => records,
                Err(e) => {
                    warn!(error = %e, "fingerprint lookup failed, duplicate check skipped");
                    fresh.push(candidate);
                    continue;
                }
            };
            let existing = records
                .into_iter()
                .find(|r| r.site != candidate.site && held.contains(&r.info_hash));
            match existing {
                Some(record) => duplicates.push((candidate, record.info_hash)),
                None => fresh.push(candidate),
            }
        }
        (fresh, duplicates)
    }
}

/// Summarize the byte movement the plan implies per partition. Class bytes
/// count once however many members the eviction lists.
fn space_changes(
    states: &[PartitionState],
    plan: &Plan,
    dedup: &DedupIndex,
) -> BTreeMap<PartitionId, SpaceChange> {
    let mut spaces: BTreeMap<PartitionId, SpaceChange> = states
        .iter()
        .map(|s| {
            let change = SpaceChange {
                before: s.used,
                ..Default::default()
            };
            (s.id.clone(), change)
        })
        .collect();

    let mut counted: HashSet<(PartitionId, usize)> = HashSet::new();
    for eviction in &plan.evictions {
        let Some((partition, idx)) = dedup.class_of(&eviction.info_hash) else {
            continue;
        };
        if !counted.insert((partition.clone(), idx)) {
            continue;
        }
        if let (Some(change), Some(class)) = (spaces.get_mut(partition), dedup.class(partition, idx))
        {
            change.evicted += class.bytes;
        }
    }
    for acquisition in &plan.acquisitions {
        if let Some(change) = spaces.get_mut(&acquisition.partition) {
            change.acquired += acquisition.candidate.size;
        }
    }
    for change in spaces.values_mut() {
        change.after = change.before - change.evicted + change.acquired;
    }
    spaces
}
