/// SQL DDL for the seedbed content store.
/// WAL mode enabled at connection time.
pub const SCHEMA_VERSION: u32 = 1;

pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS torrents (
    info_hash TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    fingerprint TEXT NOT NULL,
    site TEXT NOT NULL,
    seed_id INTEGER NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS uk_torrents_fingerprint_site ON torrents(fingerprint, site);
CREATE UNIQUE INDEX IF NOT EXISTS uk_torrents_site_seed ON torrents(site, seed_id);
CREATE INDEX IF NOT EXISTS idx_torrents_fingerprint ON torrents(fingerprint);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);
"#;

pub const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA busy_timeout = 5000;
PRAGMA synchronous = NORMAL;
"#;
