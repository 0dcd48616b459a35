//! SQLite database module for the dshop engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
