//! HTTP API.
//!
//! - `POST /api/transcripts` - extract and save tasks from a transcript
//! - `/api/tasks` - list, filter, update and delete saved tasks

mod routes;
mod tasks;
mod transcripts;

pub use routes::{router, serve, AppState};
