use crate::error::Result;
use crate::storage::{player_from_sql, sql_id};
use crate::types::{EntryReason, LedgerEntry, PlayerId};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Error::FromSqlConversionFailure;
use rusqlite::{params, Connection};
use uuid::Uuid;

pub struct EntryStore<'a> {
    conn: &'a Connection,
}

impl<'a> EntryStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn append(&self, entry: &LedgerEntry) -> Result<()> {
        self.conn.execute(
            "INSERT INTO ledger_entries (id, player_id, delta, balance_after, reason, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.id.to_string(),
                sql_id(entry.player_id),
                entry.delta,
                entry.balance_after,
                entry.reason.as_str(),
                entry.timestamp.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    /// Most recent entries first.
    pub fn history(&self, player_id: PlayerId, limit: usize) -> Result<Vec<LedgerEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, player_id, delta, balance_after, reason, created_at
             FROM ledger_entries WHERE player_id = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT ?2",
        )?;

        let entry_iter = stmt.query_map(params![sql_id(player_id), limit as i64], |row| {
            let id: String = row.get(0)?;
            let reason: String = row.get(4)?;

            Ok(LedgerEntry {
                id: Uuid::parse_str(&id)
                    .map_err(|e| FromSqlConversionFailure(0, Type::Text, Box::new(e)))?,
                player_id: player_from_sql(row.get(1)?),
                delta: row.get(2)?,
                balance_after: row.get(3)?,
                reason: reason
                    .parse::<EntryReason>()
                    .map_err(|e| FromSqlConversionFailure(4, Type::Text, e.into()))?,
                timestamp: DateTime::from_timestamp_millis(row.get(5)?).unwrap_or_else(Utc::now),
            })
        })?;

        let mut entries = Vec::new();
        for entry in entry_iter {
            entries.push(entry?);
        }

        Ok(entries)
    }
}
