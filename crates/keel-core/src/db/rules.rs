//! Categorization rule storage

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{MatchType, NewRule, Rule};

const RULE_COLUMNS: &str =
    "id, match_type, pattern, set_category, set_vendor, priority, active, hits, created_at";

impl Database {
    pub fn insert_rule(&self, rule: &NewRule) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO rules (match_type, pattern, set_category, set_vendor, priority)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                rule.match_type.as_str(),
                rule.pattern,
                rule.set_category,
                rule.set_vendor,
                rule.priority,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Active rules in evaluation order: ascending priority, then insertion
    /// order as the tie-break so evaluation is deterministic.
    pub fn list_active_rules(&self) -> Result<Vec<Rule>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RULE_COLUMNS} FROM rules WHERE active = 1 ORDER BY priority ASC, id ASC"
        ))?;
        let rules = stmt
            .query_map([], row_to_rule)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rules)
    }

    /// All rules regardless of active flag, for display
    pub fn list_rules(&self) -> Result<Vec<Rule>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RULE_COLUMNS} FROM rules ORDER BY priority ASC, id ASC"
        ))?;
        let rules = stmt
            .query_map([], row_to_rule)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rules)
    }

    pub fn increment_rule_hits(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("UPDATE rules SET hits = hits + 1 WHERE id = ?", params![id])?;
        Ok(())
    }

    /// Whether an equivalent (pattern, category) rule already exists.
    /// Guards auto-promotion against creating duplicates.
    pub fn rule_exists(&self, pattern: &str, set_category: &str) -> Result<bool> {
        let conn = self.conn()?;
        let id: Option<i64> = conn
            .query_row(
                "SELECT id FROM rules WHERE pattern = ? AND set_category = ? LIMIT 1",
                params![pattern, set_category],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.is_some())
    }
}

fn row_to_rule(row: &rusqlite::Row<'_>) -> rusqlite::Result<Rule> {
    let match_type: String = row.get(1)?;
    let created_at: String = row.get(8)?;
    Ok(Rule {
        id: row.get(0)?,
        match_type: match_type.parse().unwrap_or(MatchType::Contains),
        pattern: row.get(2)?,
        set_category: row.get(3)?,
        set_vendor: row.get(4)?,
        priority: row.get(5)?,
        active: row.get(6)?,
        hits: row.get(7)?,
        created_at: parse_datetime(&created_at),
    })
}
