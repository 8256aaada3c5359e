//! SQLite backend for the rollcall attendance tracker.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The `(user, shift, date)` uniqueness
//! of attendance records and the single-default rule for assignments are
//! enforced by the schema itself.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
