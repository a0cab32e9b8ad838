//! The root!
//!
//! A plain greeting, everything interesting lives under `/api`

/// Greet whoever knocks on the front door
pub async fn root() -> &'static str {
    "Hello from the Notes API server!"
}
