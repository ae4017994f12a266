use std::path::Path;

use async_trait::async_trait;
use sysinfo::Disks;

use seedbed_core::types::{Candidate, Holding, Manifest};

/// Failure reported by an external collaborator.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("client error: {0}")]
    Client(String),
}

/// A tracker catalog. One implementation per site lives outside this crate.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Fetch the current acquisition listings.
    async fn fetch_catalog(&self) -> Result<Vec<Candidate>, CollaboratorError>;

    /// Fetch the file manifest of one listing, for fingerprinting content
    /// that is not held locally.
    async fn fetch_manifest(
        &self,
        site: &str,
        seed_id: u64,
    ) -> Result<Manifest, CollaboratorError>;
}

/// The seeding client holding local content.
#[async_trait]
pub trait SeedClient: Send + Sync {
    /// Current holdings with live activity and manifests.
    async fn holdings(&self) -> Result<Vec<Holding>, CollaboratorError>;
}

/// Free-space source for partition roots.
pub trait DiskProbe: Send + Sync {
    /// Free bytes on the filesystem containing `root`, or None when the
    /// query fails.
    fn free_space(&self, root: &Path) -> Option<u64>;
}

/// Probe backed by the operating system's mount table.
pub struct SysinfoProbe;

impl DiskProbe for SysinfoProbe {
    fn free_space(&self, root: &Path) -> Option<u64> {
        let disks = Disks::new_with_refreshed_list();
        disks
            .list()
            .iter()
            .filter(|d| root.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().as_os_str().len())
            .map(|d| d.available_space())
    }
}
