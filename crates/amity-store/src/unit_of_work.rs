//! Commit boundary for staged mutations.
//!
//! A [`UnitOfWork`] maps to one SQLite transaction. Core operations stage
//! their writes through it and never commit on their own; the caller decides
//! when to [`complete`](UnitOfWork::complete). Dropping an unfinished unit
//! rolls everything back.
//!
//! The unit borrows the [`Database`] mutably instead of holding a
//! `rusqlite::Transaction`, so it stays `Send` and can live across the
//! `.await` points of remote storage calls.

use rusqlite::{Connection, Params};

use crate::database::Database;
use crate::error::Result;

pub struct UnitOfWork<'db> {
    db: &'db mut Database,
    affected: usize,
    finished: bool,
}

impl Database {
    /// Begin a unit of work.
    pub fn unit_of_work(&mut self) -> Result<UnitOfWork<'_>> {
        self.conn().execute_batch("BEGIN")?;
        Ok(UnitOfWork {
            db: self,
            affected: 0,
            finished: false,
        })
    }
}

impl<'db> UnitOfWork<'db> {
    /// Connection for reads inside the transaction.
    pub fn conn(&self) -> &Connection {
        self.db.conn()
    }

    /// Execute a write and count the rows it touched.
    pub(crate) fn stage<P: Params>(&mut self, sql: &str, params: P) -> Result<usize> {
        let rows = self.db.conn().execute(sql, params)?;
        self.affected += rows;
        Ok(rows)
    }

    /// Rows touched so far.
    pub fn affected(&self) -> usize {
        self.affected
    }

    /// Persist all staged changes atomically.
    ///
    /// Returns `true` if at least one row was affected. A failed `COMMIT` is
    /// rolled back and reported as an error; nothing staged is durable then.
    pub fn complete(mut self) -> Result<bool> {
        self.finished = true;
        if let Err(e) = self.db.conn().execute_batch("COMMIT") {
            tracing::warn!(error = %e, "commit failed, rolling back");
            let _ = self.db.conn().execute_batch("ROLLBACK");
            return Err(e.into());
        }
        tracing::debug!(rows = self.affected, "unit of work committed");
        Ok(self.affected > 0)
    }
}

impl Drop for UnitOfWork<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.db.conn().execute_batch("ROLLBACK") {
                tracing::warn!(error = %e, "rollback of abandoned unit of work failed");
            }
        }
    }
}
