//! All things related to the storage of notes

use core::fmt;
use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::sqlite::SqliteJournalMode;
use sqlx::sqlite::SqlitePoolOptions;

pub use form_types::*;
pub use Config as DatabaseConfig;

use crate::notes::Note;
use types::MIGRATOR;
use types::SqlxNote;

mod form_types;
mod types;

/// Storage errors
#[derive(Debug)]
pub enum Error {
    /// A connection error with the storage
    Connection(String),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Connection(error) => write!(f, "Connection error: {error}"),
        }
    }
}

/// Result type for all storage interactions
pub type Result<T> = core::result::Result<T, Error>;

/// Database configuration
pub enum Config {
    /// Detect configuration from environment
    DetectConfig,

    /// Use existing connection
    ExistingConnection(SqlitePool),
}

/// `SQLite` storage
#[derive(Clone)]
pub struct Database {
    /// Pool of connections
    connection_pool: SqlitePool,
}

impl Database {
    /// Create a new `SQLite` storage
    pub async fn from_config(config: Config) -> Self {
        match config {
            Config::DetectConfig => Self::new().await,
            Config::ExistingConnection(pool) => Self::new_with_pool(pool).await,
        }
    }

    /// Create `SQLite` storage
    ///
    /// Use the `DATABASE_PATH` environment variable
    ///
    /// Migrations will be run
    async fn new() -> Self {
        let database_path = std::env::var("DATABASE_PATH").expect("Valid DATABASE_PATH");

        // the database file might live in a directory that does not exist yet
        let path = std::path::Path::new(&database_path);
        if let Some(directory) = path.parent()
            && !directory.as_os_str().is_empty()
        {
            std::fs::create_dir_all(directory).expect("Valid database directory");
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite://{database_path}"))
            .expect("Valid database path")
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let connection_pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options)
            .await
            .expect("Valid connection");

        Self::new_with_pool(connection_pool).await
    }

    /// Create `SQLite` storage with existing pool
    ///
    /// Migrations will be run
    async fn new_with_pool(connection_pool: SqlitePool) -> Self {
        let migration_result = MIGRATOR.run(&connection_pool).await;

        if let Err(err) = migration_result {
            panic!("Migrations could not run: {err}");
        }

        Self { connection_pool }
    }
}

impl Database {
    /// Find all notes outside the hidden section
    pub async fn find_all_visible_notes(&self) -> Result<Vec<Note>> {
        let notes = sqlx::query_as::<_, SqlxNote>(
            r"
            SELECT *
            FROM notes
            WHERE hidden = 0
            ORDER BY id",
        )
        .fetch_all(&self.connection_pool)
        .await
        .map(Note::from_sqlx_note_multiple)
        .map_err(connection_error)?;

        Ok(notes)
    }

    /// Find all notes inside the hidden section
    pub async fn find_all_hidden_notes(&self) -> Result<Vec<Note>> {
        let notes = sqlx::query_as::<_, SqlxNote>(
            r"
            SELECT *
            FROM notes
            WHERE hidden = 1
            ORDER BY id",
        )
        .fetch_all(&self.connection_pool)
        .await
        .map(Note::from_sqlx_note_multiple)
        .map_err(connection_error)?;

        Ok(notes)
    }

    /// Find a single note by its ID
    pub async fn find_single_note_by_id(&self, id: i64) -> Result<Option<Note>> {
        let note = sqlx::query_as::<_, SqlxNote>(
            r"
            SELECT *
            FROM notes
            WHERE id = ?
            LIMIT 1",
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
        .map(Note::from_sqlx_note_optional)
        .map_err(connection_error)?;

        Ok(note)
    }

    /// Find a single note by its title
    pub async fn find_single_note_by_title(&self, title: &str) -> Result<Option<Note>> {
        let note = sqlx::query_as::<_, SqlxNote>(
            r"
            SELECT *
            FROM notes
            WHERE title = ?
            LIMIT 1",
        )
        .bind(title)
        .fetch_optional(&self.connection_pool)
        .await
        .map(Note::from_sqlx_note_optional)
        .map_err(connection_error)?;

        Ok(note)
    }

    /// Find all notes matching the given IDs
    ///
    /// IDs without a note are simply absent from the result
    pub async fn find_all_notes_by_ids(&self, ids: &[i64]) -> Result<Vec<Note>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            r"
            SELECT *
            FROM notes
            WHERE id IN ({})
            ORDER BY id",
            placeholders(ids.len()),
        );

        let mut query = sqlx::query_as::<_, SqlxNote>(&query);
        for id in ids {
            query = query.bind(*id);
        }

        let notes = query
            .fetch_all(&self.connection_pool)
            .await
            .map(Note::from_sqlx_note_multiple)
            .map_err(connection_error)?;

        Ok(notes)
    }

    /// Create a note
    pub async fn create_note(&self, values: &CreateNoteValues<'_>) -> Result<Note> {
        let note = sqlx::query_as::<_, SqlxNote>(
            r"
            INSERT INTO notes (title, content, pinned, hidden)
            VALUES (?, ?, ?, ?)
            RETURNING *",
        )
        .bind(values.title)
        .bind(values.content)
        .bind(values.pinned)
        .bind(values.hidden)
        .fetch_one(&self.connection_pool)
        .await
        .map(Note::from_sqlx_note)
        .map_err(connection_error)?;

        Ok(note)
    }

    /// Update a note
    ///
    /// Absent pinned/hidden values keep the stored state
    pub async fn update_note(
        &self,
        note: &Note,
        values: &UpdateNoteValues<'_>,
    ) -> Result<Option<Note>> {
        let updated_note = sqlx::query_as::<_, SqlxNote>(
            r"
            UPDATE notes
            SET title = ?, content = ?, pinned = ?, hidden = ?,
                updatedAt = strftime('%Y-%m-%d %H:%M:%f', 'now')
            WHERE id = ?
            RETURNING *",
        )
        .bind(values.title)
        .bind(values.content)
        .bind(values.pinned.unwrap_or(note.pinned))
        .bind(values.hidden.unwrap_or(note.hidden))
        .bind(note.id)
        .fetch_optional(&self.connection_pool)
        .await
        .map(Note::from_sqlx_note_optional)
        .map_err(connection_error)?;

        Ok(updated_note)
    }

    /// Update only the content of a note
    ///
    /// The clipboard note never changes its title or pinned state
    pub async fn update_note_content(
        &self,
        note: &Note,
        content: Option<&str>,
    ) -> Result<Option<Note>> {
        let updated_note = sqlx::query_as::<_, SqlxNote>(
            r"
            UPDATE notes
            SET content = ?, updatedAt = strftime('%Y-%m-%d %H:%M:%f', 'now')
            WHERE id = ?
            RETURNING *",
        )
        .bind(content)
        .bind(note.id)
        .fetch_optional(&self.connection_pool)
        .await
        .map(Note::from_sqlx_note_optional)
        .map_err(connection_error)?;

        Ok(updated_note)
    }

    /// Clear the hidden flag of a note
    pub async fn unhide_note(&self, note: &Note) -> Result<Option<Note>> {
        let unhidden_note = sqlx::query_as::<_, SqlxNote>(
            r"
            UPDATE notes
            SET hidden = 0, updatedAt = strftime('%Y-%m-%d %H:%M:%f', 'now')
            WHERE id = ?
            RETURNING *",
        )
        .bind(note.id)
        .fetch_optional(&self.connection_pool)
        .await
        .map(Note::from_sqlx_note_optional)
        .map_err(connection_error)?;

        Ok(unhidden_note)
    }

    /// Delete a note
    ///
    /// Reports whether a row was actually deleted; the note might have been
    /// deleted concurrently since it was read
    pub async fn delete_note(&self, note: &Note) -> Result<bool> {
        let result = sqlx::query(
            r"
            DELETE FROM notes
            WHERE id = ?",
        )
        .bind(note.id)
        .execute(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete multiple notes in one go
    ///
    /// All notes are deleted in a single transaction, or none are
    pub async fn delete_all_notes_by_ids(&self, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            r"
            DELETE FROM notes
            WHERE id IN ({})
            RETURNING id",
            placeholders(ids.len()),
        );

        let mut transaction = self
            .connection_pool
            .begin()
            .await
            .map_err(connection_error)?;

        let mut delete = sqlx::query_scalar::<_, i64>(&query);
        for id in ids {
            delete = delete.bind(*id);
        }

        let deleted_ids = delete
            .fetch_all(&mut *transaction)
            .await
            .map_err(connection_error)?;

        transaction.commit().await.map_err(connection_error)?;

        Ok(deleted_ids)
    }
}

/// Placeholder list for a dynamic `IN` clause
fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Convert `SQLx` to storage connection error
fn connection_error<E>(err: E) -> Error
where
    E: std::error::Error,
{
    Error::Connection(err.to_string())
}
