use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::registry::{CandidateRecord, Registry, UnifiedRecord};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS candidates (
            id           INTEGER PRIMARY KEY,
            source_id    TEXT NOT NULL,
            raw_url      TEXT NOT NULL,
            name         TEXT NOT NULL DEFAULT '',
            description  TEXT NOT NULL DEFAULT '',
            category     TEXT,
            popularity   INTEGER CHECK(popularity IS NULL OR popularity >= 0),
            collected_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_candidates_source ON candidates(source_id);

        -- Latest deduplicated snapshot
        CREATE TABLE IF NOT EXISTS servers (
            url          TEXT PRIMARY KEY,
            name         TEXT NOT NULL,
            description  TEXT NOT NULL,
            categories   TEXT NOT NULL,
            sources      TEXT NOT NULL,
            popularity   INTEGER,
            updated_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;
    Ok(())
}

// ── Candidates ──

/// Replace everything previously collected from `source_id` with `records`.
pub fn replace_candidates(
    conn: &Connection,
    source_id: &str,
    records: &[CandidateRecord],
) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        tx.execute("DELETE FROM candidates WHERE source_id = ?1", [source_id])?;
        let mut stmt = tx.prepare(
            "INSERT INTO candidates (source_id, raw_url, name, description, category, popularity)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for r in records {
            count += stmt.execute(rusqlite::params![
                source_id,
                r.raw_url,
                r.name,
                r.description,
                r.category,
                r.popularity.map(|p| p.min(i64::MAX as u64) as i64),
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

/// All stored candidates, grouped by source in the order each was collected.
pub fn fetch_candidates(conn: &Connection) -> Result<Vec<CandidateRecord>> {
    let mut stmt = conn.prepare(
        "SELECT source_id, raw_url, name, description, category, popularity
         FROM candidates ORDER BY source_id, id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let popularity: Option<i64> = row.get(5)?;
            Ok(CandidateRecord {
                source_id: row.get(0)?,
                raw_url: row.get(1)?,
                name: row.get(2)?,
                description: row.get(3)?,
                category: row.get(4)?,
                popularity: popularity.and_then(|p| u64::try_from(p).ok()),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Registry snapshot ──

pub fn save_registry(conn: &Connection, registry: &Registry) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    {
        tx.execute("DELETE FROM servers", [])?;
        let mut stmt = tx.prepare(
            "INSERT INTO servers (url, name, description, categories, sources, popularity)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for (key, r) in registry {
            stmt.execute(rusqlite::params![
                key.as_str(),
                r.name,
                r.description,
                serde_json::to_string(&r.categories)?,
                serde_json::to_string(&r.sources)?,
                r.popularity.map(|p| p.min(i64::MAX as u64) as i64),
            ])?;
        }
    }
    tx.commit()?;
    Ok(registry.len())
}

pub fn fetch_servers(conn: &Connection) -> Result<Vec<UnifiedRecord>> {
    let mut stmt = conn.prepare(
        "SELECT url, name, description, categories, sources, popularity
         FROM servers ORDER BY url",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<i64>>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(url, name, description, categories, sources, popularity)| -> Result<UnifiedRecord> {
            Ok(UnifiedRecord {
                url,
                name,
                description,
                categories: serde_json::from_str::<BTreeSet<String>>(&categories)?,
                sources: serde_json::from_str::<BTreeSet<String>>(&sources)?,
                popularity: popularity.and_then(|p| u64::try_from(p).ok()),
            })
        })
        .collect()
}

// ── Stats ──

pub struct Stats {
    pub candidates: usize,
    pub sources: usize,
    pub servers: usize,
    pub per_source: Vec<(String, usize)>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |sql: &str| -> Result<usize> {
        let n: i64 = conn.query_row(sql, [], |r| r.get(0))?;
        Ok(n as usize)
    };

    let mut stmt = conn.prepare(
        "SELECT source_id, COUNT(*) FROM candidates GROUP BY source_id ORDER BY source_id",
    )?;
    let per_source = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize)))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Stats {
        candidates: count("SELECT COUNT(*) FROM candidates")?,
        sources: count("SELECT COUNT(DISTINCT source_id) FROM candidates")?,
        servers: count("SELECT COUNT(*) FROM servers")?,
        per_source,
    })
}

// ── Tests ──
