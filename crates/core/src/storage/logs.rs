//! Audit log storage operations

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

use super::parse::{parse_datetime, parse_json_opt, parse_role, parse_uuid};
use crate::error::Result;
use crate::models::{LogEntry, LogEntryDetails, LogFilter, UserSummary};
use crate::pagination::{like_pattern, offset};
use crate::time::format_date;

pub struct LogStore<'a> {
    conn: &'a Connection,
}

impl<'a> LogStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Append an audit entry
    pub fn insert(&self, entry: &LogEntry) -> Result<()> {
        let details = entry
            .details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            "INSERT INTO logs (id, user_id, action, module, details, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.id.to_string(),
                entry.user_id.to_string(),
                entry.action,
                entry.module,
                details,
                entry.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Entries for one actor, oldest first
    pub fn list_for_user(&self, user_id: Uuid) -> Result<Vec<LogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, action, module, details, created_at
             FROM logs WHERE user_id = ?1 ORDER BY created_at ASC",
        )?;
        let entries = stmt
            .query_map(params![user_id.to_string()], map_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// One page of entries and the total count for the filter
    pub fn list(&self, filter: &LogFilter) -> Result<(Vec<LogEntryDetails>, u64)> {
        let skip = offset(filter.page, filter.limit)?;

        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<Value> = Vec::new();

        if let Some(user_id) = filter.user_id {
            clauses.push("l.user_id = ?");
            args.push(Value::Text(user_id.to_string()));
        }
        if let Some(query) = filter.query.as_deref().filter(|q| !q.trim().is_empty()) {
            clauses.push("(l.action LIKE ? ESCAPE '\\' OR l.module LIKE ? ESCAPE '\\')");
            let pattern = like_pattern(query.trim());
            args.push(Value::Text(pattern.clone()));
            args.push(Value::Text(pattern));
        }
        if let Some(date) = filter.date {
            // created_at is RFC3339 in UTC, so the first ten chars are the day
            clauses.push("substr(l.created_at, 1, 10) = ?");
            args.push(Value::Text(format_date(date)));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let from_sql = "FROM logs l INNER JOIN users u ON u.id = l.user_id";

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) {} {}", from_sql, where_sql),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT l.id, l.user_id, l.action, l.module, l.details, l.created_at,
                    u.name, u.last_name, u.email, u.role
             {} {} ORDER BY l.created_at {} LIMIT ? OFFSET ?",
            from_sql,
            where_sql,
            filter.order.as_sql()
        );
        args.push(Value::Integer(filter.limit as i64));
        args.push(Value::Integer(skip as i64));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                let entry = map_entry(row)?;
                let user = UserSummary {
                    id: entry.user_id,
                    name: row.get(6)?,
                    last_name: row.get(7)?,
                    email: row.get(8)?,
                    role: parse_role(&row.get::<_, String>(9)?)?,
                };
                Ok(LogEntryDetails { entry, user })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok((rows, total as u64))
    }
}

fn map_entry(row: &Row<'_>) -> rusqlite::Result<LogEntry> {
    Ok(LogEntry {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        user_id: parse_uuid(&row.get::<_, String>(1)?)?,
        action: row.get(2)?,
        module: row.get(3)?,
        details: parse_json_opt(row.get::<_, Option<String>>(4)?)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?)?,
    })
}
