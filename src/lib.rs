//! # Tasksmith
//!
//! Turns free-form meeting transcripts into structured, persisted tasks.
//!
//! This library provides:
//! - A transcript clean-up step that strips markup and noise
//! - An extraction pipeline backed by an OpenAI-compatible chat service
//! - SQLite task storage with filtering and updates
//! - An HTTP API over all of the above
//!
//! ## Request Flow
//!
//! ```text
//!   POST /api/transcripts
//!            │
//!            ▼
//!     text::sanitize ──▶ TaskExtractor::extract ──▶ TaskStore::create_tasks
//!                         (client → interpret
//!                              → normalize)
//! ```
//!
//! ## Modules
//! - `extraction`: retrying client, response interpreter, task normalizer
//! - `llm`: chat-completion transport and its error taxonomy
//! - `task`: the canonical task type
//! - `store`: persistence

pub mod api;
pub mod config;
pub mod extraction;
pub mod llm;
pub mod store;
pub mod task;
pub mod text;

pub use config::Config;
pub use extraction::{ExtractionError, TaskExtractor};
pub use task::{Priority, Task, TaskStatus};
