//! User correction history and vendor memory aggregates

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::Correction;

impl Database {
    pub fn insert_correction(
        &self,
        transaction_id: i64,
        old_category: Option<&str>,
        new_category: &str,
        old_vendor: Option<&str>,
        new_vendor: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO corrections (transaction_id, old_category, new_category, old_vendor, new_vendor)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![transaction_id, old_category, new_category, old_vendor, new_vendor],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_corrections(&self, limit: i64) -> Result<Vec<Correction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, transaction_id, old_category, new_category, old_vendor, new_vendor, created_at
            FROM corrections ORDER BY id DESC LIMIT ?
            "#,
        )?;
        let corrections = stmt
            .query_map(params![limit], |row| {
                let created_at: String = row.get(6)?;
                Ok(Correction {
                    id: row.get(0)?,
                    transaction_id: row.get(1)?,
                    old_category: row.get(2)?,
                    new_category: row.get(3)?,
                    old_vendor: row.get(4)?,
                    new_vendor: row.get(5)?,
                    created_at: parse_datetime(&created_at),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(corrections)
    }

    /// How many corrections exist mapping this exact vendor to this
    /// category. Drives the auto-promotion threshold.
    pub fn count_corrections_for(&self, vendor: &str, new_category: &str) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM corrections c
            JOIN transactions t ON t.id = c.transaction_id
            WHERE t.vendor = ? AND c.new_category = ?
            "#,
            params![vendor, new_category],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Corrected-category frequencies for transactions whose vendor
    /// substring-matches the candidate, most frequent first. The memory
    /// tier's aggregate: computed in SQL instead of rescanning corrections
    /// in application code.
    pub fn vendor_category_counts(&self, vendor_fragment: &str) -> Result<Vec<(String, i64)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT c.new_category, COUNT(*) AS n
            FROM corrections c
            JOIN transactions t ON t.id = c.transaction_id
            WHERE t.vendor IS NOT NULL
              AND LOWER(t.vendor) LIKE '%' || LOWER(?) || '%'
            GROUP BY c.new_category
            ORDER BY n DESC, c.new_category ASC
            "#,
        )?;
        let counts = stmt
            .query_map(params![vendor_fragment], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(counts)
    }
}
