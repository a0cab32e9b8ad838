//! Notes API management
//!
//! All mutations are checked against the note access rules: the clipboard
//! note keeps its title and pinned state and outlives every delete, and a
//! note that is currently hidden only changes with a valid PIN.

use axum::Extension;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde::Serialize;

use crate::database::CreateNoteValues;
use crate::database::Database;
use crate::database::UpdateNoteValues;
use crate::notes::CLIPBOARD_TITLE;
use crate::notes::Note;

use super::Credential;
use super::Error;
use super::Form;
use super::PathParameters;
use super::Success;

/// The note response information
///
/// The pinned/hidden flags are served as `0`/`1`, the way they are stored
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    /// The note ID
    pub id: i64,

    /// Title of the note
    pub title: String,

    /// Content of the note
    pub content: Option<String>,

    /// Creation date
    pub created_at: NaiveDateTime,

    /// Last updated at
    pub updated_at: NaiveDateTime,

    /// Pinned to the top of the list
    pub pinned: u8,

    /// Hidden behind the PIN
    pub hidden: u8,
}

impl NoteResponse {
    /// Create a note response from a [`Note`](Note)
    fn from_note(note: Note) -> Self {
        Self {
            id: note.id,
            title: note.title,
            content: note.content,
            created_at: note.created_at,
            updated_at: note.updated_at,
            pinned: u8::from(note.pinned),
            hidden: u8::from(note.hidden),
        }
    }

    /// Create a note response from multiple [`Note`](Note)s
    fn from_note_multiple(mut notes: Vec<Note>) -> Vec<Self> {
        notes.drain(..).map(Self::from_note).collect::<Vec<Self>>()
    }
}

/// List all notes outside the hidden section
///
/// No credential required
pub async fn list(
    Extension(database): Extension<Database>,
) -> Result<Success<Vec<NoteResponse>>, Error> {
    let notes = database
        .find_all_visible_notes()
        .await
        .map_err(Error::internal_server_error)?;

    Ok(Success::ok(NoteResponse::from_note_multiple(notes)))
}

/// List all notes inside the hidden section
///
/// Without a valid PIN this serves an empty list instead of an error; the
/// existence of hidden notes is never leaked to unauthenticated callers
pub async fn list_hidden(
    Extension(database): Extension<Database>,
    credential: Credential,
) -> Result<Success<Vec<NoteResponse>>, Error> {
    if !credential.is_valid() {
        return Ok(Success::ok(Vec::new()));
    }

    let notes = database
        .find_all_hidden_notes()
        .await
        .map_err(Error::internal_server_error)?;

    Ok(Success::ok(NoteResponse::from_note_multiple(notes)))
}

/// Create note form
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteForm {
    /// Title of the new note
    title: Option<String>,

    /// Optional content of the new note
    content: Option<String>,

    /// Pin the note to the top of the list, defaults to off
    pinned: Option<bool>,

    /// Tuck the note away behind the PIN, defaults to off
    hidden: Option<bool>,
}

/// Create a note based on the [`CreateNoteForm`](CreateNoteForm) form
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -d '{ "title": "Shopping", "content": "milk, eggs" }' \
///     http://localhost:3001/api/notes
/// ```
///
/// Response:
/// ```json
/// { "data": { "id": 1, "title": "Shopping", "pinned": 0, "hidden": 0, ... } }
/// ```
pub async fn create(
    Extension(database): Extension<Database>,
    Form(form): Form<CreateNoteForm>,
) -> Result<Success<NoteResponse>, Error> {
    let title = form.title.unwrap_or_default();

    if title.is_empty() {
        return Err(Error::bad_request("Title is required"));
    }

    if title == CLIPBOARD_TITLE {
        return Err(Error::bad_request(format!(
            r#"Cannot create a note with the reserved title "{CLIPBOARD_TITLE}"."#
        )));
    }

    let values = CreateNoteValues {
        title: &title,
        content: form.content.as_deref(),
        pinned: form.pinned.unwrap_or(false),
        hidden: form.hidden.unwrap_or(false),
    };

    let note = database
        .create_note(&values)
        .await
        .map_err(Error::internal_server_error)?;

    Ok(Success::created(NoteResponse::from_note(note)))
}

/// Update note form
///
/// The pinned/hidden flags are tri-state: an absent flag keeps the stored
/// value, an explicit `true`/`false` sets it
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteForm {
    /// New title of the note
    title: Option<String>,

    /// New content of the note, absent clears it
    content: Option<String>,

    /// New pinned state
    pinned: Option<bool>,

    /// New hidden state
    hidden: Option<bool>,
}

/// Update a note based on the [`UpdateNoteForm`](UpdateNoteForm) form
///
/// A note that is currently hidden requires a valid PIN, no matter which
/// fields change; that includes bringing it back out of the hidden section.
/// The clipboard note only ever changes its content.
pub async fn update(
    Extension(database): Extension<Database>,
    credential: Credential,
    PathParameters(note_id): PathParameters<i64>,
    Form(form): Form<UpdateNoteForm>,
) -> Result<Success<NoteResponse>, Error> {
    let title = form.title.unwrap_or_default();

    if title.is_empty() {
        return Err(Error::bad_request("Title is required"));
    }

    let note = fetch_note(&database, note_id).await?;

    if note.hidden && !credential.is_valid() {
        tracing::debug!("Update of hidden note {note_id} denied without valid PIN");

        return Err(Error::forbidden(
            "Unauthorized. Valid PIN required to modify a hidden note.",
        ));
    }

    let updated_note = if note.is_clipboard() {
        if title != CLIPBOARD_TITLE || matches!(form.pinned, Some(false)) {
            return Err(Error::forbidden(
                "Cannot change title or unpin the special clipboard note.",
            ));
        }

        // only the content moves, title and pinned stay what they are
        database
            .update_note_content(&note, form.content.as_deref())
            .await
            .map_err(Error::internal_server_error)?
    } else {
        if title == CLIPBOARD_TITLE {
            return Err(Error::forbidden(format!(
                r#"Cannot change note title to the reserved title "{CLIPBOARD_TITLE}"."#
            )));
        }

        let values = UpdateNoteValues {
            title: &title,
            content: form.content.as_deref(),
            pinned: form.pinned,
            hidden: form.hidden,
        };

        database
            .update_note(&note, &values)
            .await
            .map_err(Error::internal_server_error)?
    };

    // the note might have been deleted between the read and the write
    updated_note.map_or_else(
        || Err(Error::not_found("Note not found")),
        |note| Ok(Success::ok(NoteResponse::from_note(note))),
    )
}

/// Bring a note back out of the hidden section
///
/// Always requires a valid PIN, even before the note is looked up
pub async fn unhide(
    Extension(database): Extension<Database>,
    credential: Credential,
    PathParameters(note_id): PathParameters<i64>,
) -> Result<Success<NoteResponse>, Error> {
    if !credential.is_valid() {
        return Err(Error::forbidden(
            "Unauthorized. Valid PIN required to unhide a note.",
        ));
    }

    let note = fetch_note(&database, note_id).await?;

    if !note.hidden {
        return Err(Error::bad_request("Note is not hidden"));
    }

    let unhidden_note = database
        .unhide_note(&note)
        .await
        .map_err(Error::internal_server_error)?;

    unhidden_note.map_or_else(
        || Err(Error::not_found("Note not found")),
        |note| Ok(Success::ok(NoteResponse::from_note(note))),
    )
}

/// Delete a note
///
/// The clipboard note is never deleted; a hidden note requires a valid PIN
pub async fn delete(
    Extension(database): Extension<Database>,
    credential: Credential,
    PathParameters(note_id): PathParameters<i64>,
) -> Result<Success<&'static str>, Error> {
    let note = fetch_note(&database, note_id).await?;

    if note.is_clipboard() {
        tracing::debug!("Delete of the clipboard note denied");

        return Err(Error::forbidden("Cannot delete the special clipboard note."));
    }

    if note.hidden && !credential.is_valid() {
        tracing::debug!("Delete of hidden note {note_id} denied without valid PIN");

        return Err(Error::forbidden(
            "Unauthorized. Valid PIN required to delete a hidden note.",
        ));
    }

    let deleted = database
        .delete_note(&note)
        .await
        .map_err(Error::internal_server_error)?;

    // the note might have been deleted between the read and the write
    if !deleted {
        return Err(Error::not_found("Note not found"));
    }

    Ok(Success::<&'static str>::no_content())
}

/// Batch delete form
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeleteForm {
    /// IDs of the notes to delete
    ids: Option<Vec<i64>>,
}

/// The result of a batch delete
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeleteResponse {
    /// How many notes were deleted
    deleted: usize,

    /// The IDs of the deleted notes
    ids: Vec<i64>,
}

/// Delete multiple notes in one go
///
/// The batch is checked as a whole before anything happens: one hidden note
/// without a valid PIN, or the clipboard note anywhere in the batch, rejects
/// all of it. The deletes run in a single transaction, so either every
/// matched note disappears or none do. IDs without a note are skipped and
/// simply not reported back.
pub async fn delete_batch(
    Extension(database): Extension<Database>,
    credential: Credential,
    Form(form): Form<BatchDeleteForm>,
) -> Result<Success<BatchDeleteResponse>, Error> {
    let ids = form.ids.unwrap_or_default();

    if ids.is_empty() {
        return Err(Error::bad_request("An array of note IDs is required."));
    }

    let invalid = ids
        .iter()
        .filter(|id| **id <= 0)
        .map(ToString::to_string)
        .collect::<Vec<String>>();

    if !invalid.is_empty() {
        return Err(
            Error::bad_request("All note IDs must be positive integers")
                .with_description(format!("Invalid IDs: {}", invalid.join(", "))),
        );
    }

    let notes = database
        .find_all_notes_by_ids(&ids)
        .await
        .map_err(Error::internal_server_error)?;

    if notes.is_empty() {
        return Err(Error::not_found("No valid notes found"));
    }

    let has_hidden_note = notes.iter().any(|note| note.hidden);

    if has_hidden_note && !credential.is_valid() {
        tracing::debug!("Batch delete with hidden notes denied without valid PIN");

        return Err(Error::forbidden(
            "Unauthorized. Valid PIN required to delete a hidden note.",
        ));
    }

    if let Some(clipboard_note) = notes.iter().find(|note| note.is_clipboard()) {
        tracing::debug!("Batch delete containing the clipboard note denied");

        return Err(Error::forbidden(format!(
            "Cannot delete the special clipboard note (ID: {}).",
            clipboard_note.id
        )));
    }

    let matched_ids = notes.iter().map(|note| note.id).collect::<Vec<i64>>();

    let deleted_ids = database
        .delete_all_notes_by_ids(&matched_ids)
        .await
        .map_err(Error::internal_server_error)?;

    Ok(Success::ok(BatchDeleteResponse {
        deleted: deleted_ids.len(),
        ids: deleted_ids,
    }))
}

/// Fetch a note from the database
async fn fetch_note(database: &Database, note_id: i64) -> Result<Note, Error> {
    database
        .find_single_note_by_id(note_id)
        .await
        .map_err(Error::internal_server_error)?
        .map_or_else(|| Err(Error::not_found("Note not found")), Ok)
}
