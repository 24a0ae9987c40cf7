//! Directory Query: paginated member browsing and single-profile lookup.

use amity_shared::constants::{DEFAULT_MAX_AGE, DEFAULT_MIN_AGE};
use amity_shared::{AmityError, MemberOrder, PageRequest, PagedList};
use chrono::{Months, NaiveDate, Utc};
use rusqlite::types::Value;
use rusqlite::Connection;
use serde::Serialize;

use crate::error::Result;
use crate::models::{self, MemberSummary, User};
use crate::paging::SqlPageSource;
use crate::photos::{self, PhotoVisibility};
use crate::users::{self, USER_COLUMNS};

/// Directory filter as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberFilter {
    pub gender: Option<String>,
    pub min_age: u32,
    pub max_age: u32,
    pub order_by: MemberOrder,
}

impl Default for MemberFilter {
    fn default() -> Self {
        Self {
            gender: None,
            min_age: DEFAULT_MIN_AGE,
            max_age: DEFAULT_MAX_AGE,
            order_by: MemberOrder::default(),
        }
    }
}

/// A filter whose gender has been settled. Only this type reaches the query,
/// so the requester-based default is applied exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMemberFilter {
    gender: String,
    min_age: u32,
    max_age: u32,
    #[serde(skip)]
    order_by: MemberOrder,
}

impl MemberFilter {
    /// Settle the gender against the requester's own and check the age range.
    pub fn resolve(self, requester_gender: &str) -> Result<ResolvedMemberFilter> {
        if self.min_age > self.max_age {
            return Err(AmityError::validation(format!(
                "minAge ({}) cannot exceed maxAge ({})",
                self.min_age, self.max_age
            ))
            .into());
        }

        let gender = match self.gender.filter(|g| !g.trim().is_empty()) {
            Some(gender) => gender,
            None if requester_gender.eq_ignore_ascii_case("male") => "female".to_string(),
            None => "male".to_string(),
        };

        Ok(ResolvedMemberFilter {
            gender,
            min_age: self.min_age,
            max_age: self.max_age,
            order_by: self.order_by,
        })
    }
}

impl ResolvedMemberFilter {
    /// The gender actually queried, for echoing back to the caller.
    pub fn gender(&self) -> &str {
        &self.gender
    }

    pub fn min_age(&self) -> u32 {
        self.min_age
    }

    pub fn max_age(&self) -> u32 {
        self.max_age
    }

    pub fn order_by(&self) -> MemberOrder {
        self.order_by
    }

    /// Inclusive date-of-birth window for the age range on `today`.
    fn dob_bounds(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let years_back = |years: u32| {
            today
                .checked_sub_months(Months::new(years.saturating_mul(12)))
                .unwrap_or(NaiveDate::MIN)
        };
        (years_back(self.max_age.saturating_add(1)), years_back(self.min_age))
    }
}

/// One page of the directory as seen by `requester`.
pub fn list_members(
    conn: &Connection,
    requester: &User,
    filter: &ResolvedMemberFilter,
    request: PageRequest,
) -> Result<PagedList<MemberSummary>> {
    let today = Utc::now().date_naive();
    let (min_dob, max_dob) = filter.dob_bounds(today);

    let order_by = match filter.order_by {
        MemberOrder::Created => "u.created_at DESC, u.rowid DESC",
        MemberOrder::LastActive => "u.last_active DESC, u.rowid DESC",
    };

    let source = SqlPageSource::new(conn, USER_COLUMNS, "users u", users::row_to_user)
        .and_where("u.id <> ?", [Value::Text(requester.id.to_string())])
        .and_where("u.gender = ?", [Value::Text(filter.gender.clone())])
        .and_where("u.date_of_birth >= ?", [Value::Text(models::format_date(min_dob))])
        .and_where("u.date_of_birth <= ?", [Value::Text(models::format_date(max_dob))])
        .order_by(order_by);

    let page = PagedList::create(&source, request)?;

    let mut photo_sets = Vec::with_capacity(page.items.len());
    for user in &page.items {
        photo_sets.push(photos::photos_for_user(conn, user.id, PhotoVisibility::Public)?);
    }
    let mut photo_sets = photo_sets.into_iter();

    tracing::debug!(
        requester = %requester.username,
        gender = %filter.gender,
        total = page.total_count,
        "listed members"
    );

    Ok(page.map(|user| {
        let photos = photo_sets.next().unwrap_or_default();
        MemberSummary::project(user, &photos, today)
    }))
}

/// Profile of `username` as `viewer` sees it. Members see all of their own
/// photos; everyone else sees approved ones only.
pub fn get_member(conn: &Connection, username: &str, viewer: &str) -> Result<MemberSummary> {
    let user = users::require_user(conn, username)?;
    let visibility = PhotoVisibility::for_viewer(&user.username, viewer);
    let photos = photos::photos_for_user(conn, user.id, visibility)?;
    Ok(MemberSummary::project(user, &photos, Utc::now().date_naive()))
}
