//! Durable activity log for the library.

use crate::{Operation, Result};
use rusqlite::{Connection, Transaction};
use serde::{Deserialize, Serialize};

/// Number of operations retained when no explicit limit is configured.
pub const DEFAULT_KEEP_LAST: usize = 1000;

/// A display-ready row of the activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSummary {
    pub operation_id: String,
    pub timestamp: i64,
    pub operation_type: String,
    pub description: String,
}

/// Records mutations to the `operations` table and keeps it bounded.
pub struct OperationLog {
    keep_last: usize,
}

impl Default for OperationLog {
    fn default() -> Self {
        Self::new(DEFAULT_KEEP_LAST)
    }
}

impl OperationLog {
    /// Creates a log that retains only the most recent `keep_last` operations.
    pub fn new(keep_last: usize) -> Self {
        Self { keep_last }
    }

    /// Serialises `op` and appends it to the `operations` table within `tx`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ShelfError::Database`] if the INSERT fails, or
    /// [`crate::ShelfError::Json`] if `op` cannot be serialised.
    pub fn log(&self, tx: &Transaction, op: &Operation) -> Result<()> {
        let op_json = serde_json::to_string(op)?;

        tx.execute(
            "INSERT INTO operations (operation_id, timestamp, operation_type, operation_data)
             VALUES (?, ?, ?, ?)",
            rusqlite::params![op.operation_id(), op.timestamp(), op.type_name(), op_json],
        )?;

        Ok(())
    }

    /// Deletes everything but the newest `keep_last` operations.
    ///
    /// Call this after every [`log`](Self::log) call to keep the table bounded in size.
    pub fn purge_if_needed(&self, tx: &Transaction) -> Result<()> {
        tx.execute(
            "DELETE FROM operations WHERE id NOT IN (
                SELECT id FROM operations ORDER BY id DESC LIMIT ?
            )",
            [self.keep_last as i64],
        )?;
        Ok(())
    }

    /// Returns up to `limit` summaries, newest first.
    pub fn list(&self, conn: &Connection, limit: usize) -> Result<Vec<OperationSummary>> {
        let mut stmt = conn.prepare(
            "SELECT operation_data FROM operations ORDER BY id DESC LIMIT ?",
        )?;
        let rows = stmt
            .query_map([limit as i64], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.iter()
            .map(|data| -> Result<OperationSummary> {
                let op: Operation = serde_json::from_str(data)?;
                Ok(OperationSummary {
                    operation_id: op.operation_id().to_string(),
                    timestamp: op.timestamp(),
                    operation_type: op.type_name().to_string(),
                    description: op.describe(),
                })
            })
            .collect()
    }

    /// Deletes all operations. Returns the number deleted.
    pub fn purge_all(&self, conn: &Connection) -> Result<usize> {
        Ok(conn.execute("DELETE FROM operations", [])?)
    }
}
