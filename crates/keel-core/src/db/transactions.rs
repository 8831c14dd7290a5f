//! Transaction operations

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{NewTransaction, Transaction};

const TRANSACTION_COLUMNS: &str = "id, account_id, posted_at, description, amount, \
     category, vendor, confidence, why, is_transfer, created_at";

impl Database {
    /// Insert a transaction. Categorization fields start empty and are
    /// filled in by the categorization engine.
    pub fn insert_transaction(&self, account_id: i64, tx: &NewTransaction) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO transactions (account_id, posted_at, description, amount, is_transfer)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                account_id,
                tx.posted_at.to_string(),
                tx.description,
                tx.amount,
                tx.is_transfer,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?"),
            params![id],
            row_to_transaction,
        )
        .optional()
        .map_err(Into::into)
    }

    /// List transactions, newest first
    pub fn list_transactions(&self, account_id: Option<i64>, limit: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS} FROM transactions
            WHERE (?1 IS NULL OR account_id = ?1)
            ORDER BY posted_at DESC, id DESC
            LIMIT ?2
            "#
        ))?;
        let txs = stmt
            .query_map(params![account_id, limit], row_to_transaction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(txs)
    }

    /// Transactions posted on or after `since`, oldest first. This is the
    /// pattern-detection read path, so it takes a history snapshot in one
    /// query.
    pub fn list_transactions_since(
        &self,
        account_id: Option<i64>,
        since: NaiveDate,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS} FROM transactions
            WHERE posted_at >= ?1 AND (?2 IS NULL OR account_id = ?2)
            ORDER BY posted_at ASC, id ASC
            "#
        ))?;
        let txs = stmt
            .query_map(params![since.to_string(), account_id], row_to_transaction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(txs)
    }

    /// Transactions with no category assigned yet, oldest first
    pub fn list_uncategorized(&self, limit: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS} FROM transactions
            WHERE category IS NULL
            ORDER BY posted_at ASC, id ASC
            LIMIT ?1
            "#
        ))?;
        let txs = stmt
            .query_map(params![limit], row_to_transaction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(txs)
    }

    /// Write a categorization decision onto a transaction
    pub fn update_categorization(
        &self,
        id: i64,
        category: &str,
        vendor: Option<&str>,
        confidence: f64,
        why: &str,
    ) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            r#"
            UPDATE transactions
            SET category = ?, vendor = COALESCE(?, vendor), confidence = ?, why = ?
            WHERE id = ?
            "#,
            params![category, vendor, confidence, why, id],
        )?;
        if updated == 0 {
            return Err(crate::error::Error::NotFound(format!(
                "transaction {}",
                id
            )));
        }
        Ok(())
    }
}

fn row_to_transaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<Transaction> {
    let posted_at: String = row.get(2)?;
    let created_at: String = row.get(10)?;
    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        posted_at: NaiveDate::parse_from_str(&posted_at, "%Y-%m-%d")
            .unwrap_or_else(|_| chrono::Utc::now().date_naive()),
        description: row.get(3)?,
        amount: row.get(4)?,
        category: row.get(5)?,
        vendor: row.get(6)?,
        confidence: row.get(7)?,
        why: row.get(8)?,
        is_transfer: row.get(9)?,
        created_at: parse_datetime(&created_at),
    })
}
