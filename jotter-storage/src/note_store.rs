//! Persistent store for note records backed by SQLite.

use crate::error::{StorageError, StorageResult};
use jotter_types::{Note, NoteId, RemoteNote, Timestamp};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Raw row shape pulled out of SQLite before domain parsing.
type RawNote = (String, String, String, i64, bool);

/// Persistent store for notes.
///
/// Cheap to clone; all clones share a single connection. Calls are
/// synchronous; async callers wrap them in `spawn_blocking`.
#[derive(Clone)]
pub struct NoteStore {
    conn: Arc<Mutex<Connection>>,
}

impl NoteStore {
    /// Opens (or creates) a note store at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                synced INTEGER NOT NULL DEFAULT 0
            );
            ",
        )?;
        Ok(())
    }

    /// Returns all records. No ordering guarantee; ordering is a
    /// presentation concern.
    pub fn list(&self) -> StorageResult<Vec<Note>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, title, body, updated_at, synced FROM notes")?;
        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let title: String = row.get(1)?;
            let body: String = row.get(2)?;
            let updated_at: i64 = row.get(3)?;
            let synced: bool = row.get(4)?;
            Ok((id, title, body, updated_at, synced))
        })?;

        let mut notes = Vec::new();
        for row in rows {
            notes.push(note_from_raw(row?)?);
        }
        Ok(notes)
    }

    /// Fetches one record. Absence is not an error.
    pub fn get(&self, id: &NoteId) -> StorageResult<Option<Note>> {
        let conn = self.conn.lock().unwrap();
        let raw = conn
            .query_row(
                "SELECT id, title, body, updated_at, synced FROM notes WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    let id: String = row.get(0)?;
                    let title: String = row.get(1)?;
                    let body: String = row.get(2)?;
                    let updated_at: i64 = row.get(3)?;
                    let synced: bool = row.get(4)?;
                    Ok((id, title, body, updated_at, synced))
                },
            )
            .optional()?;

        raw.map(note_from_raw).transpose()
    }

    /// Inserts a record, or fully replaces an existing one with the same id.
    pub fn upsert(&self, note: &Note) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO notes (id, title, body, updated_at, synced)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                note.id.to_string(),
                note.title,
                note.body,
                note.updated_at.unix_millis(),
                note.synced,
            ],
        )?;
        Ok(())
    }

    /// Removes a record. Removing an absent id is success.
    pub fn remove(&self, id: &NoteId) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM notes WHERE id = ?1", params![id.to_string()])?;
        Ok(())
    }

    /// Removes every record.
    pub fn clear(&self) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM notes", [])?;
        Ok(())
    }

    /// Number of stored records.
    pub fn count(&self) -> StorageResult<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Sets the synced flag, but only if the record still carries the
    /// modification time the caller read (`as_of`). Returns whether the row
    /// matched. A record edited since `as_of`, or deleted, is left alone.
    pub fn mark_synced_if_unmodified(
        &self,
        id: &NoteId,
        as_of: Timestamp,
    ) -> StorageResult<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE notes SET synced = 1 WHERE id = ?1 AND updated_at = ?2",
            params![id.to_string(), as_of.unix_millis()],
        )?;
        Ok(updated > 0)
    }

    /// Replaces content and modification time with the remote record's and
    /// sets the synced flag, but only if the row still carries `as_of`.
    /// Returns whether the row matched.
    ///
    /// This is an UPDATE, never an INSERT: a record deleted while a sync
    /// attempt was in flight stays deleted.
    pub fn adopt_remote_if_unmodified(
        &self,
        remote: &RemoteNote,
        as_of: Timestamp,
    ) -> StorageResult<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE notes SET title = ?1, body = ?2, updated_at = ?3, synced = 1
             WHERE id = ?4 AND updated_at = ?5",
            params![
                remote.title,
                remote.body,
                remote.updated_at.unix_millis(),
                remote.id.to_string(),
                as_of.unix_millis(),
            ],
        )?;
        Ok(updated > 0)
    }
}

fn note_from_raw((id, title, body, updated_at, synced): RawNote) -> StorageResult<Note> {
    let id: NoteId = id
        .parse()
        .map_err(|e| StorageError::InvalidData(format!("bad note id: {e}")))?;
    Ok(Note {
        id,
        title,
        body,
        updated_at: Timestamp::from_unix_millis(updated_at),
        synced,
    })
}
