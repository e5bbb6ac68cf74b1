//! SQLite persistence for filled quotes.
//!
//! The store owns a connection handed to it by the caller; nothing here opens a database on its
//! own behalf or keeps process-wide state.

mod schema;
pub mod store;
mod types;

pub use store::{QuoteStore, Result, SqliteQuoteStore, StorageError};
pub use types::{QuoteRecord, QuoteSummary};
