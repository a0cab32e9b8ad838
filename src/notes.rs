use anyhow::Result;
use chrono::naive::NaiveDateTime;

use crate::database::CreateNoteValues;
use crate::database::Database;

/// Title of the protected clipboard note
pub const CLIPBOARD_TITLE: &str = "Clipboard";

#[derive(Clone, Debug)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    pub pinned: bool,
    pub hidden: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Note {
    /// Is this the protected clipboard note?
    pub fn is_clipboard(&self) -> bool {
        self.title == CLIPBOARD_TITLE
    }
}

pub async fn ensure_clipboard_note(database: &Database) -> Result<()> {
    let note = database.find_single_note_by_title(CLIPBOARD_TITLE).await?;

    if note.is_none() {
        tracing::info!(r#"Clipboard note not found, creating: "{CLIPBOARD_TITLE}""#);

        let values = CreateNoteValues {
            title: CLIPBOARD_TITLE,
            content: Some(""),
            pinned: true,
            hidden: false,
        };

        database.create_note(&values).await?;
    }

    Ok(())
}
