//! Paged Query Engine.
//!
//! Turns an ordered, filtered record source into one page of items plus
//! count metadata. The engine is deliberately ignorant of what the records
//! are: callers supply the filter and sort through a [`PageSource`] and the
//! projection through [`PagedList::map`].

use std::convert::Infallible;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::error::AmityError;

/// A filtered, sorted sequence of records that can be counted and sliced.
pub trait PageSource {
    type Item;
    type Error;

    /// Number of records that pass the filter, before pagination.
    fn count(&self) -> Result<u64, Self::Error>;

    /// Records `offset..offset + limit` in sort order.
    fn fetch(&self, offset: u64, limit: u32) -> Result<Vec<Self::Item>, Self::Error>;
}

impl<T: Clone> PageSource for [T] {
    type Item = T;
    type Error = Infallible;

    fn count(&self) -> Result<u64, Infallible> {
        Ok(self.len() as u64)
    }

    fn fetch(&self, offset: u64, limit: u32) -> Result<Vec<T>, Infallible> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(self.len());
        let end = start.saturating_add(limit as usize).min(self.len());
        Ok(self[start..end].to_vec())
    }
}

/// Validated page coordinates.
///
/// Page numbers below 1 are clamped to 1, page sizes above
/// [`MAX_PAGE_SIZE`] are clamped down, and a page size of zero is rejected.
/// The fields are private so every request goes through [`PageRequest::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page_number: u32,
    page_size: u32,
}

impl PageRequest {
    pub fn new(page_number: i64, page_size: u32) -> Result<Self, AmityError> {
        if page_size == 0 {
            return Err(AmityError::validation("page size must be greater than zero"));
        }
        let page_number = u32::try_from(page_number.max(1)).unwrap_or(u32::MAX);
        Ok(Self {
            page_number,
            page_size: page_size.min(MAX_PAGE_SIZE),
        })
    }

    /// Build a request from optional query parameters, applying defaults.
    pub fn from_params(page_number: Option<i64>, page_size: Option<u32>) -> Result<Self, AmityError> {
        Self::new(page_number.unwrap_or(1), page_size.unwrap_or(DEFAULT_PAGE_SIZE))
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of records preceding this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page_number.saturating_sub(1)) * u64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Page metadata as communicated back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub current_page: u32,
    pub items_per_page: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

/// One page of items together with its count metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedList<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u64,
}

impl<T> PagedList<T> {
    /// Count the source, then fetch the requested slice.
    pub fn create<S>(source: &S, request: PageRequest) -> Result<Self, S::Error>
    where
        S: PageSource<Item = T> + ?Sized,
    {
        let total_count = source.count()?;
        let items = source.fetch(request.offset(), request.page_size())?;

        Ok(Self {
            items,
            current_page: request.page_number(),
            page_size: request.page_size(),
            total_count,
            total_pages: total_count.div_ceil(u64::from(request.page_size().max(1))),
        })
    }

    /// Project every item into another shape, keeping the metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedList<U> {
        PagedList {
            items: self.items.into_iter().map(f).collect(),
            current_page: self.current_page,
            page_size: self.page_size,
            total_count: self.total_count,
            total_pages: self.total_pages,
        }
    }

    pub fn metadata(&self) -> PageMetadata {
        PageMetadata {
            current_page: self.current_page,
            items_per_page: self.page_size,
            total_items: self.total_count,
            total_pages: self.total_pages,
        }
    }
}
