use seedbed_core::config::ConfigError;
use seedbed_store::StoreError;

use crate::traits::CollaboratorError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),
}
