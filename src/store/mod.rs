//! File-backed persistence: JSONL stores and the attempted-set checkpoint.
//!
//! All writes are append-only and flushed per record so an interrupted run
//! can resume from whatever reached the disk.

mod attempted;
mod error;
mod jsonl;

pub use attempted::AttemptedSet;
pub use error::StoreError;
pub use jsonl::{JsonlWriter, read_jsonl, read_jsonl_lenient};
