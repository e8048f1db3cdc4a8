//! SQLite ledger backend for the top-up engine.
//!
//! [`SqliteDatabase`] implements [`LedgerDatabase`](crate::traits::LedgerDatabase) and
//! [`AccountManagement`](crate::traits::AccountManagement). The low-level queries live in [`db`].
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
