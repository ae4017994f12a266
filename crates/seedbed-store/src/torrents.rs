use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use seedbed_core::ids::{Fingerprint, InfoHash};
use seedbed_core::types::Holding;

use crate::database::Database;
use crate::error::StoreError;
use crate::fingerprint::fingerprint;

/// One row of the torrents table: the durable mapping from content
/// identity to manifest fingerprint and catalog origin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentRecord {
    pub info_hash: InfoHash,
    pub name: String,
    pub fingerprint: Fingerprint,
    pub site: String,
    pub seed_id: u64,
}

pub struct TorrentRepo {
    db: Database,
}

impl TorrentRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a record. Uniqueness violations (info_hash, or the same
    /// fingerprint already registered for the site) surface as Conflict.
    #[instrument(skip(self, record), fields(info_hash = %record.info_hash, site = %record.site))]
    pub fn record(&self, record: &TorrentRecord) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO torrents (info_hash, name, fingerprint, site, seed_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    record.info_hash.as_str(),
                    record.name,
                    record.fingerprint.as_str(),
                    record.site,
                    record.seed_id as i64,
                ],
            )?;
            Ok(())
        })
    }

    #[instrument(skip(self), fields(info_hash = %info_hash))]
    pub fn get(&self, info_hash: &InfoHash) -> Result<TorrentRecord, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT info_hash, name, fingerprint, site, seed_id
                 FROM torrents WHERE info_hash = ?1",
            )?;
            let mut rows = stmt.query([info_hash.as_str()])?;
            match rows.next()? {
                Some(row) => row_to_record(row),
                None => Err(StoreError::NotFound(format!("torrent {info_hash}"))),
            }
        })
    }

    /// Look up by catalog origin.
    #[instrument(skip(self))]
    pub fn get_by_catalog(
        &self,
        site: &str,
        seed_id: u64,
    ) -> Result<Option<TorrentRecord>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT info_hash, name, fingerprint, site, seed_id
                 FROM torrents WHERE site = ?1 AND seed_id = ?2",
            )?;
            let mut rows = stmt.query(rusqlite::params![site, seed_id as i64])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_record(row)?)),
                None => Ok(None),
            }
        })
    }

    /// All records sharing a fingerprint, across sites. The (fingerprint,
    /// site) uniqueness constraint caps this at one row per site.
    #[instrument(skip(self), fields(fingerprint = %fp))]
    pub fn find_by_fingerprint(&self, fp: &Fingerprint) -> Result<Vec<TorrentRecord>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT info_hash, name, fingerprint, site, seed_id
                 FROM torrents WHERE fingerprint = ?1 ORDER BY site",
            )?;
            let mut rows = stmt.query([fp.as_str()])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                out.push(row_to_record(row)?);
            }
            Ok(out)
        })
    }

    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<TorrentRecord>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT info_hash, name, fingerprint, site, seed_id
                 FROM torrents ORDER BY info_hash",
            )?;
            let mut rows = stmt.query([])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                out.push(row_to_record(row)?);
            }
            Ok(out)
        })
    }

    /// Register holdings not yet in the table. Holdings without a manifest
    /// or catalog origin are skipped; per-row failures are logged and the
    /// run continues. Returns the number of rows inserted.
    #[instrument(skip(self, holdings), fields(total = holdings.len()))]
    pub fn ensure_known(&self, holdings: &[Holding]) -> usize {
        let mut inserted = 0;
        for holding in holdings {
            let Some(manifest) = &holding.manifest else {
                continue;
            };
            if holding.site.is_empty() || holding.seed_id == 0 {
                continue;
            }
            match self.get(&holding.info_hash) {
                Ok(_) => continue,
                Err(StoreError::NotFound(_)) => {}
                Err(e) => {
                    warn!(info_hash = %holding.info_hash, error = %e, "lookup failed, skipping");
                    continue;
                }
            }
            let record = TorrentRecord {
                info_hash: holding.info_hash.clone(),
                name: holding.name.clone(),
                fingerprint: fingerprint(manifest),
                site: holding.site.clone(),
                seed_id: holding.seed_id,
            };
            match self.record(&record) {
                Ok(()) => inserted += 1,
                Err(e) => {
                    warn!(info_hash = %holding.info_hash, error = %e, "insert failed, skipping");
                }
            }
        }
        inserted
    }
}

fn col<T: rusqlite::types::FromSql>(
    row: &rusqlite::Row<'_>,
    idx: usize,
    column: &'static str,
) -> Result<T, StoreError> {
    row.get(idx).map_err(|e| StoreError::CorruptRow {
        table: "torrents",
        column,
        detail: e.to_string(),
    })
}

fn row_to_record(row: &rusqlite::Row<'_>) -> Result<TorrentRecord, StoreError> {
    Ok(TorrentRecord {
        info_hash: InfoHash::new(col::<String>(row, 0, "info_hash")?),
        name: col(row, 1, "name")?,
        fingerprint: Fingerprint::new(col::<String>(row, 2, "fingerprint")?),
        site: col(row, 3, "site")?,
        seed_id: col::<i64>(row, 4, "seed_id")? as u64,
    })
}
