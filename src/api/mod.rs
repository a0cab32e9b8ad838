//! All API endpoint setup

use axum::Router;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;

pub use credential::Credential;
pub use request::Form;
pub use request::PathParameters;
pub use response::Error;
pub use response::Success;

mod auth;
mod credential;
mod notes;
mod request;
mod response;

/// Get the Axum router for all API routes
pub fn router() -> Router {
    let auth = Router::new()
        .route("/", post(auth::login))
        .route("/status", get(auth::status))
        .route("/logout", post(auth::logout));

    let notes = Router::new()
        .route("/", get(notes::list))
        .route("/", post(notes::create))
        .route("/hidden", get(notes::list_hidden))
        .route("/batch", delete(notes::delete_batch))
        .route("/{note}", put(notes::update))
        .route("/{note}", delete(notes::delete))
        .route("/{note}/unhide", post(notes::unhide));

    Router::new().nest("/auth", auth).nest("/notes", notes)
}
