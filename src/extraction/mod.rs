//! Task-extraction pipeline.
//!
//! ```text
//!   transcript (already sanitized)
//!        │
//!        ▼
//!   ExtractionClient ── prompt, per-attempt timeout, retry with backoff
//!        │ RawResponse
//!        ▼
//!   interpret ───────── shape adapters, preamble stripping, JSON parse
//!        │ Vec<RawCandidate>
//!        ▼
//!   normalize ───────── key aliases, defaults, per-entry rejection
//!        │ Vec<Task>
//!        ▼
//!   caller (persistence)
//! ```
//!
//! Stages run strictly in sequence. Failures from the first two stages end
//! the pipeline with an [`ExtractionError`]; the normalizer never fails as a
//! whole and drops bad entries one by one.

mod client;
mod error;
mod interpret;
mod normalize;
mod pipeline;

pub use client::{build_messages, ExtractionClient, ExtractionSettings, SYSTEM_PROMPT};
pub use error::ExtractionError;
pub use interpret::{interpret, RawCandidate};
pub use normalize::{normalize, normalize_with_report, EntryRejection, NormalizeReport};
pub use pipeline::TaskExtractor;
