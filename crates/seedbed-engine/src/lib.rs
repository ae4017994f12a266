pub mod error;
pub mod run;
pub mod snapshot;
pub mod traits;

pub use error::EngineError;
pub use run::{Engine, RunOptions, RunReport, SpaceChange};
pub use traits::{Catalog, CollaboratorError, DiskProbe, SeedClient, SysinfoProbe};
