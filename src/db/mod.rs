//! SQLite persistence for the ledger.
//!
//! `init_db` opens the pool and applies `schema.sql`; `Repository` and its
//! `UnitOfWork` own every query against users, positions, balances and
//! reward rows.

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::Repository;
