//! SQLite storage for notes and the elements drawn on them.
//!
//! Readers that want to follow changes ask for a watch receiver. It gets the current rows right
//! away and a fresh copy after every write that touches them.

use crate::error::{EaselError, ErrorKind};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::{
    path::Path,
    sync::mpsc::{channel, Receiver, Sender},
    time::{SystemTime, UNIX_EPOCH},
};

pub type NoteId = i64;
pub type ElementId = i64;

pub const STROKE_TYPE: &str = "STROKE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    pub id: NoteId,
    pub created_at_ms: i64,
}

impl Note {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
        Ok(Note {
            id: row.get(0)?,
            created_at_ms: row.get(1)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementRow {
    /// `None` until the row has been inserted.
    pub id: Option<ElementId>,
    pub note_id: NoteId,
    pub element_type: String,
    pub transform: String,
    pub data: String,
}

impl ElementRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<ElementRow> {
        Ok(ElementRow {
            id: Some(row.get(0)?),
            note_id: row.get(1)?,
            element_type: row.get(2)?,
            transform: row.get(3)?,
            data: row.get(4)?,
        })
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|since| since.as_millis() as i64)
        .unwrap_or_default()
}

pub struct Database {
    conn: Connection,
    note_watchers: Vec<Sender<Vec<Note>>>,
    element_watchers: Vec<(NoteId, Sender<Vec<ElementRow>>)>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("note_watchers", &self.note_watchers.len())
            .field("element_watchers", &self.element_watchers.len())
            .finish()
    }
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EaselError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        tracing::info!("open database {}", path.display());
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, EaselError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, EaselError> {
        let db = Database {
            conn,
            note_watchers: Vec::new(),
            element_watchers: Vec::new(),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), EaselError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS notes (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS canvas_elements (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              note_id INTEGER NOT NULL,
              type TEXT NOT NULL,
              transform TEXT NOT NULL,
              data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS canvas_elements_note ON canvas_elements(note_id);
            "#,
        )?;
        Ok(())
    }

    // notes

    pub fn all_notes(&self) -> Result<Vec<Note>, EaselError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, created_at FROM notes ORDER BY created_at DESC, id DESC")?;
        let rows = stmt.query_map([], Note::from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn note(&self, id: NoteId) -> Result<Note, EaselError> {
        self.conn
            .query_row(
                "SELECT id, created_at FROM notes WHERE id = ?1",
                params![id],
                Note::from_row,
            )
            .optional()?
            .ok_or_else(|| EaselError::new(ErrorKind::NoSuchNote(id)))
    }

    pub fn insert_note(&mut self) -> Result<Note, EaselError> {
        self.insert_note_at(now_ms())
    }

    pub fn insert_note_at(&mut self, created_at_ms: i64) -> Result<Note, EaselError> {
        self.conn.execute(
            "INSERT INTO notes (created_at) VALUES (?1)",
            params![created_at_ms],
        )?;
        let note = Note {
            id: self.conn.last_insert_rowid(),
            created_at_ms,
        };

        tracing::debug!("inserted note {}", note.id);
        self.notify_notes()?;
        Ok(note)
    }

    /// Removes the note along with all of its elements.
    pub fn delete_note(&mut self, id: NoteId) -> Result<(), EaselError> {
        let tx = self.conn.transaction()?;
        let notes = tx.execute("DELETE FROM notes WHERE id = ?1", params![id])?;
        if notes == 0 {
            // dropping the transaction rolls it back
            return Err(EaselError::new(ErrorKind::NoSuchNote(id)));
        }

        let elements = tx.execute(
            "DELETE FROM canvas_elements WHERE note_id = ?1",
            params![id],
        )?;
        tx.commit()?;

        tracing::debug!("deleted note {id} and {elements} elements");
        self.notify_notes()?;
        self.notify_elements(id)
    }

    // elements

    pub fn elements_for_note(&self, note_id: NoteId) -> Result<Vec<ElementRow>, EaselError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, note_id, type, transform, data
            FROM canvas_elements
            WHERE note_id = ?1
            ORDER BY id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![note_id], ElementRow::from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Inserts or replaces every row, returning the row ids in order.
    pub fn insert_all(&mut self, rows: &[ElementRow]) -> Result<Vec<ElementId>, EaselError> {
        let tx = self.conn.transaction()?;
        let mut ids = Vec::with_capacity(rows.len());
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO canvas_elements (id, note_id, type, transform, data)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for row in rows {
                stmt.execute(params![
                    row.id,
                    row.note_id,
                    row.element_type,
                    row.transform,
                    row.data
                ])?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;

        tracing::debug!("inserted {} elements", ids.len());
        self.notify_elements_of(rows)?;
        Ok(ids)
    }

    pub fn update(&mut self, row: &ElementRow) -> Result<(), EaselError> {
        self.update_all(std::slice::from_ref(row))
    }

    /// Updates rows by id in one transaction. Rows that are not stored are left alone.
    pub fn update_all(&mut self, rows: &[ElementRow]) -> Result<(), EaselError> {
        let tx = self.conn.transaction()?;
        let mut updated = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                UPDATE canvas_elements
                SET note_id = ?2, type = ?3, transform = ?4, data = ?5
                WHERE id = ?1
                "#,
            )?;
            for row in rows {
                let id = row.id.ok_or_else(|| {
                    EaselError::new(ErrorKind::InvalidInput("updating an element without an id"))
                })?;
                updated += stmt.execute(params![
                    id,
                    row.note_id,
                    row.element_type,
                    row.transform,
                    row.data
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!("updated {updated} of {} elements", rows.len());
        self.notify_elements_of(rows)
    }

    pub fn delete(&mut self, row: &ElementRow) -> Result<(), EaselError> {
        self.delete_all(std::slice::from_ref(row))
    }

    /// Deletes rows by id in one transaction. Either every row goes or none do.
    pub fn delete_all(&mut self, rows: &[ElementRow]) -> Result<(), EaselError> {
        let ids = rows
            .iter()
            .map(|row| {
                row.id.ok_or_else(|| {
                    EaselError::new(ErrorKind::InvalidInput("deleting an element without an id"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let tx = self.conn.transaction()?;
        let mut deleted = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM canvas_elements WHERE id = ?1")?;
            for id in ids.iter() {
                deleted += stmt.execute(params![id])?;
            }
        }
        tx.commit()?;

        tracing::debug!("deleted {deleted} of {} elements", rows.len());
        self.notify_elements_of(rows)
    }

    pub fn delete_all_for_note(&mut self, note_id: NoteId) -> Result<(), EaselError> {
        let deleted = self.conn.execute(
            "DELETE FROM canvas_elements WHERE note_id = ?1",
            params![note_id],
        )?;

        tracing::debug!("deleted {deleted} elements of note {note_id}");
        self.notify_elements(note_id)
    }

    // watching

    pub fn watch_notes(&mut self) -> Result<Receiver<Vec<Note>>, EaselError> {
        let (tx, rx) = channel();
        // the receiver is still in hand, so this can't fail
        let _ = tx.send(self.all_notes()?);
        self.note_watchers.push(tx);
        Ok(rx)
    }

    pub fn watch_note_elements(
        &mut self,
        note_id: NoteId,
    ) -> Result<Receiver<Vec<ElementRow>>, EaselError> {
        let (tx, rx) = channel();
        let _ = tx.send(self.elements_for_note(note_id)?);
        self.element_watchers.push((note_id, tx));
        Ok(rx)
    }

    fn notify_notes(&mut self) -> Result<(), EaselError> {
        if self.note_watchers.is_empty() {
            return Ok(());
        }

        let notes = self.all_notes()?;
        self.note_watchers
            .retain(|watcher| watcher.send(notes.clone()).is_ok());
        Ok(())
    }

    fn notify_elements(&mut self, note_id: NoteId) -> Result<(), EaselError> {
        if !self.element_watchers.iter().any(|(id, _)| *id == note_id) {
            return Ok(());
        }

        let rows = self.elements_for_note(note_id)?;
        self.element_watchers
            .retain(|(id, watcher)| *id != note_id || watcher.send(rows.clone()).is_ok());
        Ok(())
    }

    fn notify_elements_of(&mut self, rows: &[ElementRow]) -> Result<(), EaselError> {
        let mut notes = rows.iter().map(|row| row.note_id).collect::<Vec<_>>();
        notes.sort_unstable();
        notes.dedup();
        notes
            .into_iter()
            .try_for_each(|note_id| self.notify_elements(note_id))
    }
}
