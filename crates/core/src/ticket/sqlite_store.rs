//! SQLite-backed ticket store.
//!
//! The whole document lives in a JSON `document` column; `status`,
//! `created_at` and `updated_at` are mirrored into plain columns for
//! filtering and ordering. The connection mutex serializes every
//! operation, which is what makes `transition_status` and `put_partial`
//! behave as atomic read-modify-write steps.

use std::path::Path;
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection};
use serde_json::Value;

use super::merge::deep_merge;
use super::{Ticket, TicketError, TicketFilter, TicketStatus, TicketStore, TicketSummary};

/// SQLite-backed ticket store.
pub struct SqliteTicketStore {
    conn: Mutex<Connection>,
}

impl SqliteTicketStore {
    /// Open (or create) a database file and initialize the schema.
    pub fn new(path: &Path) -> Result<Self, TicketError> {
        let conn = Connection::open(path).map_err(|e| TicketError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    pub fn in_memory() -> Result<Self, TicketError> {
        let conn =
            Connection::open_in_memory().map_err(|e| TicketError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), TicketError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tickets (
                ticket_id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                document TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tickets_status ON tickets(status);
            CREATE INDEX IF NOT EXISTS idx_tickets_created_at ON tickets(created_at);
            "#,
        )
        .map_err(|e| TicketError::Database(e.to_string()))?;

        Ok(())
    }

    fn load(conn: &Connection, ticket_id: &str) -> Result<Ticket, TicketError> {
        let result = conn.query_row(
            "SELECT document FROM tickets WHERE ticket_id = ?",
            params![ticket_id],
            |row| row.get::<_, String>(0),
        );

        let raw = match result {
            Ok(raw) => raw,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(TicketError::NotFound(ticket_id.to_string()));
            }
            Err(e) => return Err(TicketError::Database(e.to_string())),
        };

        serde_json::from_str(&raw).map_err(|e| TicketError::Database(e.to_string()))
    }

    fn save(conn: &Connection, ticket: &Ticket) -> Result<(), TicketError> {
        let document =
            serde_json::to_string(ticket).map_err(|e| TicketError::Database(e.to_string()))?;

        conn.execute(
            "UPDATE tickets SET status = ?, updated_at = ?, document = ? WHERE ticket_id = ?",
            params![
                ticket.status.as_str(),
                rfc3339(&ticket.updated_at),
                document,
                ticket.ticket_id,
            ],
        )
        .map_err(|e| TicketError::Database(e.to_string()))?;

        Ok(())
    }

    fn summaries(
        conn: &Connection,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<TicketSummary>, TicketError> {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| TicketError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params, |row| row.get::<_, String>(0))
            .map_err(|e| TicketError::Database(e.to_string()))?;

        let mut summaries = Vec::new();
        for row in rows {
            let raw = row.map_err(|e| TicketError::Database(e.to_string()))?;
            let ticket: Ticket =
                serde_json::from_str(&raw).map_err(|e| TicketError::Database(e.to_string()))?;
            summaries.push(ticket.summary());
        }

        Ok(summaries)
    }
}

fn rfc3339(dt: &chrono::DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl TicketStore for SqliteTicketStore {
    fn create(&self, ticket: &Ticket) -> Result<Ticket, TicketError> {
        let conn = self.conn.lock().unwrap();

        let document =
            serde_json::to_string(ticket).map_err(|e| TicketError::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO tickets (ticket_id, status, created_at, updated_at, document) VALUES (?, ?, ?, ?, ?)",
            params![
                ticket.ticket_id,
                ticket.status.as_str(),
                rfc3339(&ticket.created_at),
                rfc3339(&ticket.updated_at),
                document,
            ],
        )
        .map_err(|e| TicketError::Database(e.to_string()))?;

        Ok(ticket.clone())
    }

    fn get(&self, ticket_id: &str) -> Result<Ticket, TicketError> {
        let conn = self.conn.lock().unwrap();
        Self::load(&conn, ticket_id)
    }

    fn put_partial(&self, ticket_id: &str, partial: Value) -> Result<Ticket, TicketError> {
        let conn = self.conn.lock().unwrap();

        let result = conn.query_row(
            "SELECT document FROM tickets WHERE ticket_id = ?",
            params![ticket_id],
            |row| row.get::<_, String>(0),
        );

        let raw = match result {
            Ok(raw) => raw,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(TicketError::NotFound(ticket_id.to_string()));
            }
            Err(e) => return Err(TicketError::Database(e.to_string())),
        };

        let mut doc: Value =
            serde_json::from_str(&raw).map_err(|e| TicketError::Database(e.to_string()))?;
        if !doc.is_object() {
            return Err(TicketError::MergeConflict {
                ticket_id: ticket_id.to_string(),
                reason: "stored document is not a JSON object".to_string(),
            });
        }

        deep_merge(&mut doc, partial);

        // Refresh updatedAt after the merge so overlays cannot backdate it.
        let now = Utc::now();
        doc["updatedAt"] = Value::String(rfc3339(&now));

        let ticket: Ticket =
            serde_json::from_value(doc).map_err(|e| TicketError::MergeConflict {
                ticket_id: ticket_id.to_string(),
                reason: format!("merged document is not a valid ticket: {e}"),
            })?;

        Self::save(&conn, &ticket)?;
        Ok(ticket)
    }

    fn transition_status(
        &self,
        ticket_id: &str,
        from: TicketStatus,
        to: TicketStatus,
    ) -> Result<(), TicketError> {
        let conn = self.conn.lock().unwrap();

        // Check and update run under the connection mutex, so a losing
        // racer always observes the winner's write.
        let mut ticket = Self::load(&conn, ticket_id)?;
        if ticket.status != from {
            return Err(TicketError::invalid_status(ticket_id, ticket.status, from));
        }

        ticket.status = to;
        ticket.updated_at = Utc::now();
        Self::save(&conn, &ticket)
    }

    fn list(&self, filter: &TicketFilter) -> Result<Vec<TicketSummary>, TicketError> {
        let conn = self.conn.lock().unwrap();

        match filter.status {
            Some(status) => Self::summaries(
                &conn,
                "SELECT document FROM tickets WHERE status = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
                &[&status.as_str(), &filter.limit, &filter.offset],
            ),
            None => Self::summaries(
                &conn,
                "SELECT document FROM tickets ORDER BY created_at DESC LIMIT ? OFFSET ?",
                &[&filter.limit, &filter.offset],
            ),
        }
    }

    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError> {
        let conn = self.conn.lock().unwrap();

        let result = match filter.status {
            Some(status) => conn.query_row(
                "SELECT COUNT(*) FROM tickets WHERE status = ?",
                params![status.as_str()],
                |row| row.get(0),
            ),
            None => conn.query_row("SELECT COUNT(*) FROM tickets", [], |row| row.get(0)),
        };

        result.map_err(|e| TicketError::Database(e.to_string()))
    }

    fn scan_by_status(
        &self,
        status: TicketStatus,
        limit: i64,
    ) -> Result<Vec<TicketSummary>, TicketError> {
        let conn = self.conn.lock().unwrap();
        Self::summaries(
            &conn,
            "SELECT document FROM tickets WHERE status = ? ORDER BY created_at DESC LIMIT ?",
            &[&status.as_str(), &limit],
        )
    }

    fn scan_all(&self) -> Result<Vec<TicketSummary>, TicketError> {
        let conn = self.conn.lock().unwrap();
        Self::summaries(
            &conn,
            "SELECT document FROM tickets ORDER BY created_at DESC",
            &[],
        )
    }

    fn delete(&self, ticket_id: &str) -> Result<Ticket, TicketError> {
        let conn = self.conn.lock().unwrap();

        let ticket = Self::load(&conn, ticket_id)?;

        conn.execute(
            "DELETE FROM tickets WHERE ticket_id = ?",
            params![ticket_id],
        )
        .map_err(|e| TicketError::Database(e.to_string()))?;

        Ok(ticket)
    }
}
