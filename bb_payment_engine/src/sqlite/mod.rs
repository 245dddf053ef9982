//! SQLite backend for the BharatBartan order store.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
