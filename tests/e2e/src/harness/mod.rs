//! Test harness


pub use db_manager::{TestDatabaseManager, DEFAULT_USER};
