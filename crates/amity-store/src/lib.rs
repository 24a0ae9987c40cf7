//! # amity-store
//!
//! SQLite-backed persistence for the Amity messaging and photo core.
//!
//! The crate exposes a synchronous [`Database`] handle wrapping a
//! `rusqlite::Connection`. Reads are free functions over a connection;
//! mutations are staged on a [`UnitOfWork`] and persisted only when the
//! caller completes it.

pub mod database;
pub mod members;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod moderation;
pub mod photos;
pub mod seed;
pub mod storage;
pub mod unit_of_work;
pub mod users;

mod error;
mod paging;

pub use database::Database;
pub use error::{Result, StoreError};
pub use members::{MemberFilter, ResolvedMemberFilter};
pub use messages::DeleteOutcome;
pub use models::*;
pub use photos::PhotoVisibility;
pub use storage::{PhotoStorage, StorageError, StoredPhoto};
pub use unit_of_work::UnitOfWork;
