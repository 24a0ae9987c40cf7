//! SQL-backed [`PageSource`] for the Paged Query Engine.

use amity_shared::PageSource;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};

use crate::error::{Result, StoreError};

/// A filtered, sorted `SELECT` that the paging engine can count and slice.
///
/// `from` and `filter` are spliced into `SELECT ... FROM {from} WHERE
/// {filter}`; user input must only ever arrive through `params`.
pub(crate) struct SqlPageSource<'c, T> {
    conn: &'c Connection,
    columns: &'static str,
    from: String,
    filter: String,
    order_by: &'static str,
    params: Vec<Value>,
    map_row: fn(&Row<'_>) -> rusqlite::Result<T>,
}

impl<'c, T> SqlPageSource<'c, T> {
    pub(crate) fn new(
        conn: &'c Connection,
        columns: &'static str,
        from: impl Into<String>,
        map_row: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Self {
        Self {
            conn,
            columns,
            from: from.into(),
            filter: "1 = 1".to_string(),
            order_by: "",
            params: Vec::new(),
            map_row,
        }
    }

    /// AND another predicate onto the filter, with its bound values.
    pub(crate) fn and_where(mut self, predicate: &str, values: impl IntoIterator<Item = Value>) -> Self {
        self.filter.push_str(" AND ");
        self.filter.push_str(predicate);
        self.params.extend(values);
        self
    }

    pub(crate) fn order_by(mut self, order_by: &'static str) -> Self {
        self.order_by = order_by;
        self
    }
}

impl<T> PageSource for SqlPageSource<'_, T> {
    type Item = T;
    type Error = StoreError;

    fn count(&self) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {}", self.from, self.filter);
        let n: i64 = self
            .conn
            .query_row(&sql, params_from_iter(self.params.iter()), |row| row.get(0))?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    fn fetch(&self, offset: u64, limit: u32) -> Result<Vec<T>> {
        let mut sql = format!("SELECT {} FROM {} WHERE {}", self.columns, self.from, self.filter);
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(self.order_by);
        }
        sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(self.params.iter()), self.map_row)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }
}
