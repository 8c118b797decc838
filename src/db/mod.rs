//! Database layer for data persistence and access.
//!
//! SQLx over PostgreSQL. Repositories in [`handlers`] encapsulate all SQL
//! for one table group and return the record structs from [`models`]. Errors
//! are categorized in [`errors`] so callers can distinguish constraint
//! violations from unrecoverable failures.
//!
//! Migrations live in `migrations/` and are embedded via
//! [`crate::migrator`]; they run automatically on startup.

pub mod errors;
pub mod handlers;
pub mod models;
