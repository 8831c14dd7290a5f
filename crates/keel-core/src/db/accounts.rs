//! Account operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{Account, AccountKind};

impl Database {
    /// Insert an account or return the existing one with the same name
    pub fn upsert_account(
        &self,
        name: &str,
        kind: AccountKind,
        opening_balance: f64,
    ) -> Result<i64> {
        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM accounts WHERE name = ?",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO accounts (name, kind, opening_balance) VALUES (?, ?, ?)",
            params![name, kind.as_str(), opening_balance],
        )?;

        Ok(conn.last_insert_rowid())
    }

    pub fn get_account(&self, id: i64) -> Result<Option<Account>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, kind, opening_balance, created_at FROM accounts WHERE id = ?",
            params![id],
            row_to_account,
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn list_accounts(&self) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, kind, opening_balance, created_at FROM accounts ORDER BY id",
        )?;
        let accounts = stmt
            .query_map([], row_to_account)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(accounts)
    }

    /// Current cash position: opening balances plus ledger sums, across all
    /// accounts or one account.
    pub fn current_cash(&self, account_id: Option<i64>) -> Result<f64> {
        let conn = self.conn()?;
        let cash: f64 = match account_id {
            Some(id) => conn.query_row(
                r#"
                SELECT COALESCE((SELECT opening_balance FROM accounts WHERE id = ?1), 0)
                     + COALESCE((SELECT SUM(amount) FROM transactions WHERE account_id = ?1), 0)
                "#,
                params![id],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                r#"
                SELECT COALESCE((SELECT SUM(opening_balance) FROM accounts), 0)
                     + COALESCE((SELECT SUM(amount) FROM transactions), 0)
                "#,
                [],
                |row| row.get(0),
            )?,
        };
        Ok(cash)
    }
}

fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    let kind_str: String = row.get(2)?;
    let created_at: String = row.get(4)?;
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: kind_str.parse().unwrap_or(AccountKind::Checking),
        opening_balance: row.get(3)?,
        created_at: parse_datetime(&created_at),
    })
}
