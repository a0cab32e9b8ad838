//! Form types

/// Values to create a Note
pub struct CreateNoteValues<'a> {
    /// The title of the note
    pub title: &'a str,

    /// Content of the note
    ///
    /// Can be anything
    pub content: Option<&'a str>,

    /// Pin the note to the top of the list
    pub pinned: bool,

    /// Tuck the note away behind the PIN
    pub hidden: bool,
}

/// Values to update a Note
pub struct UpdateNoteValues<'a> {
    /// New title of the note
    pub title: &'a str,

    /// New content of the note
    pub content: Option<&'a str>,

    /// New pinned state, absent keeps the stored state
    pub pinned: Option<bool>,

    /// New hidden state, absent keeps the stored state
    pub hidden: Option<bool>,
}
