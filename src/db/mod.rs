mod schema;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::models::*;
use crate::remote::SortOrder;

const NOTE_COLUMNS: &str = "id, title, content, summary, created_at, updated_at, user_id";

/// SQLite storage for the reference backend.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "notewell")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("notewell.db"))
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();
        schema::run_migrations(&conn)
    }

    // ============================================================
    // User operations
    // ============================================================

    pub fn create_user(&self, email: &str) -> Result<ProvisionedUser> {
        let conn = self.conn.lock();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            created_at: timestamp_now(),
        };
        let token = Uuid::new_v4().simple().to_string();

        conn.execute(
            "INSERT INTO users (id, email, token, created_at) VALUES (?, ?, ?, ?)",
            (
                &user.id,
                &user.email,
                &token,
                format_datetime(user.created_at),
            ),
        )?;

        Ok(ProvisionedUser { user, token })
    }

    pub fn get_user_by_token(&self, token: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        let user = conn
            .query_row(
                "SELECT id, email, created_at FROM users WHERE token = ?",
                [token],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        created_at: parse_datetime(row.get::<_, String>(2)?),
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    // ============================================================
    // Note operations
    // ============================================================

    /// All notes owned by `user_id`. Ties on `created_at` keep insertion order.
    pub fn get_notes_by_user(
        &self,
        user_id: &str,
        order: SortOrder,
    ) -> Result<Vec<RemoteNoteRecord>> {
        let conn = self.conn.lock();
        let direction = match order {
            SortOrder::NewestFirst => "DESC",
            SortOrder::OldestFirst => "ASC",
        };
        let mut stmt = conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE user_id = ?
             ORDER BY created_at {direction}, rowid ASC"
        ))?;

        let notes = stmt
            .query_map([user_id], note_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(notes)
    }

    pub fn get_note(&self, id: &str) -> Result<Option<RemoteNoteRecord>> {
        let conn = self.conn.lock();
        find_note(&conn, id)
    }

    pub fn create_note(&self, input: RemoteNoteInsert) -> Result<RemoteNoteRecord> {
        let conn = self.conn.lock();
        let id = Uuid::new_v4().to_string();
        let now = timestamp_now();

        conn.execute(
            &format!("INSERT INTO notes ({NOTE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)"),
            (
                &id,
                &input.title,
                &input.content,
                &input.summary,
                format_datetime(now),
                format_datetime(now),
                &input.user_id,
            ),
        )?;

        Ok(RemoteNoteRecord {
            id,
            title: input.title,
            content: input.content,
            summary: input.summary,
            created_at: now,
            updated_at: now,
            user_id: input.user_id,
        })
    }

    /// Overwrite the editable fields. Returns the updated record, or `None`
    /// when no note with that id exists.
    pub fn update_note(&self, id: &str, patch: RemoteNotePatch) -> Result<Option<RemoteNoteRecord>> {
        let conn = self.conn.lock();
        let Some(existing) = find_note(&conn, id)? else {
            return Ok(None);
        };

        let updated_at = patch.updated_at.trunc_subsecs(6).max(existing.created_at);

        let rows = conn.execute(
            "UPDATE notes SET title = ?, content = ?, summary = ?, updated_at = ? WHERE id = ?",
            (
                &patch.title,
                &patch.content,
                &patch.summary,
                format_datetime(updated_at),
                id,
            ),
        )?;
        if rows == 0 {
            return Ok(None);
        }

        Ok(Some(RemoteNoteRecord {
            id: existing.id,
            title: patch.title,
            content: patch.content,
            summary: patch.summary,
            created_at: existing.created_at,
            updated_at,
            user_id: existing.user_id,
        }))
    }

    pub fn delete_note(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute("DELETE FROM notes WHERE id = ?", [id])?;
        Ok(rows > 0)
    }
}

fn find_note(conn: &Connection, id: &str) -> Result<Option<RemoteNoteRecord>> {
    let note = conn
        .query_row(
            &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?"),
            [id],
            note_from_row,
        )
        .optional()?;
    Ok(note)
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<RemoteNoteRecord> {
    Ok(RemoteNoteRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        summary: row.get(3)?,
        created_at: parse_datetime(row.get::<_, String>(4)?),
        updated_at: parse_datetime(row.get::<_, String>(5)?),
        user_id: row.get(6)?,
    })
}

/// Stored precision is microseconds; values handed back to callers match it.
fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width UTC timestamps so that `ORDER BY created_at` sorts chronologically.
fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
