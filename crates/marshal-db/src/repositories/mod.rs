//! Trait implementations for SQLite
//!
//! Each repository is implemented in its own module.

mod ledger;
