//! The canonical task record produced from a transcript.
//!
//! A [`Task`] can only be built through [`Task::new`], which trims and checks
//! its fields, so every value in circulation is already valid. Priority and
//! status parse only from their exact lowercase names.

pub mod task;

pub use task::{Priority, Task, TaskError, TaskStatus};
