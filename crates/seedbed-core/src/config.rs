use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ids::PartitionId;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no partitions configured")]
    NoPartitions,

    #[error("partition id is empty")]
    EmptyPartitionId,

    #[error("duplicate partition id: {0}")]
    DuplicatePartitionId(PartitionId),

    #[error("partition {0} has an empty filesystem root")]
    EmptyRoot(PartitionId),

    #[error("{name} must be positive, got {value}")]
    NonPositiveHorizon { name: &'static str, value: f64 },
}

/// One capacity-constrained storage pool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PartitionConfig {
    pub id: PartitionId,
    /// Filesystem root used to query live free space.
    pub root: PathBuf,
    /// Capacity cap in bytes; 0 means derive from free disk space.
    #[serde(default)]
    pub capacity_cap: u64,
    /// Per-run acquisition cap in bytes; defaults to effective capacity / 50.
    #[serde(default)]
    pub run_cap: Option<u64>,
}

/// Weights and horizons for the scorer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Multiplier applied to promotion discounts.
    pub free_weight: f64,
    /// Horizon in days below which an acquisition must pay for itself.
    pub cost_recovery_days: f64,
    /// Days after completion during which a holding is never evicted.
    pub retention_grace_days: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            free_weight: 1.0,
            cost_recovery_days: 7.0,
            retention_grace_days: 15.0,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("cost_recovery_days", self.cost_recovery_days),
            ("retention_grace_days", self.retention_grace_days),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NonPositiveHorizon { name, value });
            }
        }
        Ok(())
    }
}

/// Validate the partition list at load time. Planning never re-checks.
pub fn validate_partitions(partitions: &[PartitionConfig]) -> Result<(), ConfigError> {
    if partitions.is_empty() {
        return Err(ConfigError::NoPartitions);
    }
    let mut seen = HashSet::new();
    for p in partitions {
        if p.id.as_str().is_empty() {
            return Err(ConfigError::EmptyPartitionId);
        }
        if !seen.insert(p.id.clone()) {
            return Err(ConfigError::DuplicatePartitionId(p.id.clone()));
        }
        if p.root.as_os_str().is_empty() {
            return Err(ConfigError::EmptyRoot(p.id.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partition(id: &str, root: &str) -> PartitionConfig {
        PartitionConfig {
            id: PartitionId::new(id),
            root: PathBuf::from(root),
            capacity_cap: 0,
            run_cap: None,
        }
    }

    #[test]
    fn valid_partitions_pass() {
        let parts = vec![partition("a", "/mnt/a"), partition("b", "/mnt/b")];
        assert!(validate_partitions(&parts).is_ok());
    }

    #[test]
    fn empty_list_rejected() {
        assert!(matches!(
            validate_partitions(&[]),
            Err(ConfigError::NoPartitions)
        ));
    }

    #[test]
    fn duplicate_id_rejected() {
        let parts = vec![partition("a", "/mnt/a"), partition("a", "/mnt/b")];
        assert!(matches!(
            validate_partitions(&parts),
            Err(ConfigError::DuplicatePartitionId(_))
        ));
    }

    #[test]
    fn empty_id_rejected() {
        let parts = vec![partition("", "/mnt/a")];
        assert!(matches!(
            validate_partitions(&parts),
            Err(ConfigError::EmptyPartitionId)
        ));
    }

    #[test]
    fn empty_root_rejected() {
        let parts = vec![partition("a", "")];
        assert!(matches!(
            validate_partitions(&parts),
            Err(ConfigError::EmptyRoot(_))
        ));
    }

    #[test]
    fn default_scoring_config_valid() {
        assert!(ScoringConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_horizon_rejected() {
        let cfg = ScoringConfig {
            cost_recovery_days: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NonPositiveHorizon {
                name: "cost_recovery_days",
                ..
            })
        ));
    }
}
