//! Core record types and list utilities
//!
//! - [`records`]: Business documents, clients and contacts as the API sends them
//! - [`sorting`]: Sort configuration and stable, locale-aware sorting
//! - [`filtering`]: Filter selections, snapshots and fuzzy search
//! - [`directory`]: Sorting and filtering for clients and contacts
//! - [`dates`]: Lenient parsing of API date strings
//! - [`error`]: Error types shared by the whole crate

pub mod dates;
pub mod directory;
pub mod error;
pub mod filtering;
pub mod records;
pub mod sorting;

#[cfg(test)]
pub mod test_helpers;
