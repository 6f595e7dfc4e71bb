//! Bizdesk - client-side state for the business desk front-end
//!
//! List sorting and filtering, persisted UI preferences with cross-instance
//! sync, and dashboard analytics over commercial documents.
//!
//! # Architecture
//!
//! - [`core`] - Record types, sorting, filtering and error types
//! - [`storage`] - Durable key-value store, change bus and persisted values
//! - [`analytics`] - Document linearization and KPI extraction
//! - [`notifications`] - Auto-expiring user-facing messages
//! - [`session`] - Application state with an explicit open/close lifecycle
//! - [`config`] - Configuration persistence
//! - [`theme`] - Theme and layout preferences
//! - [`utils`] - Utility functions (XDG directories, formatting)
//!
//! # Guarantees
//!
//! - Sorting is stable; invalid dates always sort last
//! - Filter snapshots are immutable once handed out
//! - Preference writes are atomic with owner-only permissions
//! - A failed analytics run never discards the last good results

// Allow pedantic clippy warnings that are not worth fixing for this codebase
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::needless_lifetimes)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]

pub mod analytics;
pub mod config;
pub mod core;
pub mod notifications;
pub mod session;
pub mod storage;
pub mod theme;
pub mod utils;

// Re-export commonly used types
pub use analytics::{AnalyticsPipeline, Kpis, LinearRecord};
pub use core::error::{Error, Result};
pub use core::records::BusinessDocument;
pub use session::Session;
