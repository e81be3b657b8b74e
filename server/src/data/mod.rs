//! Data layer: SQLite storage and row types

pub mod sqlite;
pub mod types;

pub use sqlite::{SqliteError, SqlitePool, SqliteService};
