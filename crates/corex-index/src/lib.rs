//! The Checkpoint Store: a SQLite-backed retention-bounded series of run
//! snapshots, keyed by session. Schema-on-read in spirit: a version mismatch
//! drops and recreates the table rather than migrating it, since checkpoints
//! are disposable resumption state, not a system of record.

pub mod db;
pub mod error;
pub mod schema;

pub use db::{CheckpointMeta, Database};
pub use error::{Error, Result};
