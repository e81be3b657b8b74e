//! Entity repositories
//!
//! Free async functions over the shared pool, one module per table. Queries
//! use positional binds and tuple `query_as` mapping.

pub mod access;
pub mod comment;
pub mod membership;
pub mod notification;
pub mod project;
pub mod review;
pub mod stats;
pub mod submission;
pub mod user;

use std::str::FromStr;

use super::SqliteError;

/// Parse a TEXT enum column, surfacing unexpected values as corrupt rows
pub(crate) fn parse_column<T: FromStr>(value: &str, column: &str) -> Result<T, SqliteError> {
    value
        .parse()
        .map_err(|_| SqliteError::CorruptRow(format!("unexpected {column} value: {value}")))
}
