//! Database storage types and functions

use chrono::NaiveDateTime;
use sqlx::migrate::Migrator;

use crate::notes::Note;

/// Migrator to run migrations on startup
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// `SQLx` version of note
///
/// The timestamp columns are camelCase in the schema, hence the renames
#[derive(sqlx::FromRow)]
pub struct SqlxNote {
    /// Note ID
    pub id: i64,

    /// Title of the note
    pub title: String,

    /// Content of the note
    pub content: Option<String>,

    /// Creation date
    #[sqlx(rename = "createdAt")]
    pub created_at: NaiveDateTime,

    /// Last updated at
    #[sqlx(rename = "updatedAt")]
    pub updated_at: NaiveDateTime,

    /// Pinned to the top of the list
    pub pinned: bool,

    /// Hidden behind the PIN
    pub hidden: bool,
}

impl Note {
    /// Create note from `SQLx` version
    pub fn from_sqlx_note(note: SqlxNote) -> Self {
        Self {
            id: note.id,
            title: note.title,
            content: note.content,
            pinned: note.pinned,
            hidden: note.hidden,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }

    /// Maybe create note from `SQLx` version
    pub fn from_sqlx_note_optional(note: Option<SqlxNote>) -> Option<Self> {
        note.map(Self::from_sqlx_note)
    }

    /// Create multiple notes from `SQLx` version
    pub fn from_sqlx_note_multiple(mut notes: Vec<SqlxNote>) -> Vec<Self> {
        notes
            .drain(..)
            .map(Self::from_sqlx_note)
            .collect::<Vec<Self>>()
    }
}
