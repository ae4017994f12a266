pub mod config;
pub mod dedup;
pub mod ids;
pub mod planning;
pub mod scoring;
pub mod types;

pub use config::{ConfigError, PartitionConfig, ScoringConfig};
pub use dedup::{ContentClass, DedupIndex};
pub use ids::{Fingerprint, InfoHash, PartitionId, RunId};
pub use planning::{
    plan, Acquisition, Eviction, PartitionState, Plan, ScoredCandidate, ScoredHolding,
};
pub use scoring::Scorer;
pub use types::{Activity, Candidate, Holding, Manifest, Promotion, PromotionSet};
