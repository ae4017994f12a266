pub mod database;
pub mod error;
pub mod fingerprint;
pub mod grouping;
pub mod schema;
pub mod torrents;

pub use database::Database;
pub use error::StoreError;
pub use fingerprint::fingerprint;
pub use grouping::group;
pub use torrents::{TorrentRecord, TorrentRepo};
