//! SQLite backend for the stock sync engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
