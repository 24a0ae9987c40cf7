//! Domain model structs persisted in the SQLite database, and the
//! caller-facing summary shapes projected from them.
//!
//! Summaries serialize with camelCase keys so they can be handed straight to
//! the HTTP layer.

use amity_shared::Role;
use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A member of the platform. Identity and credentials live elsewhere; this is
/// the profile the core reads and mutates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    /// Unique, compared case-insensitively.
    pub username: String,
    pub known_as: String,
    /// Free-form tag, only used to default the directory gender filter.
    pub gender: String,
    pub date_of_birth: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub introduction: Option<String>,
    pub looking_for: Option<String>,
    pub interests: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// Input for creating a user from the identity subsystem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub known_as: String,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default = "default_roles")]
    pub roles: Vec<Role>,
}

fn default_roles() -> Vec<Role> {
    vec![Role::Member]
}

/// Editable profile fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub introduction: Option<String>,
    pub looking_for: Option<String>,
    pub interests: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

// ---------------------------------------------------------------------------
// Photo
// ---------------------------------------------------------------------------

/// A photo owned by exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Photo {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Remote storage locator.
    pub url: String,
    /// Remote storage identifier. `None` means the photo cannot be deleted
    /// remotely (seed images).
    pub public_id: Option<String>,
    pub is_main: bool,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A private message from one user to another.
///
/// Usernames are denormalized so listings can filter without joining users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_username: String,
    pub recipient_id: Uuid,
    pub recipient_username: String,
    pub content: String,
    /// Set at most once, when the recipient opens the thread.
    pub date_read: Option<DateTime<Utc>>,
    pub message_sent: DateTime<Utc>,
    pub sender_deleted: bool,
    pub recipient_deleted: bool,
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoSummary {
    pub id: Uuid,
    pub url: String,
    pub is_main: bool,
    pub is_approved: bool,
}

impl From<&Photo> for PhotoSummary {
    fn from(p: &Photo) -> Self {
        Self {
            id: p.id,
            url: p.url.clone(),
            is_main: p.is_main,
            is_approved: p.is_approved,
        }
    }
}

/// Directory / profile view of a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemberSummary {
    pub id: Uuid,
    pub username: String,
    pub known_as: String,
    pub gender: String,
    pub age: u32,
    /// URL of the main photo, if the member has one.
    pub photo_url: Option<String>,
    pub created: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub introduction: Option<String>,
    pub looking_for: Option<String>,
    pub interests: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub photos: Vec<PhotoSummary>,
}

impl MemberSummary {
    /// Build a summary from a user and the photos visible to the viewer.
    pub fn project(user: User, photos: &[Photo], today: NaiveDate) -> Self {
        Self {
            id: user.id,
            age: age_on(user.date_of_birth, today),
            photo_url: photos.iter().find(|p| p.is_main).map(|p| p.url.clone()),
            photos: photos.iter().map(PhotoSummary::from).collect(),
            username: user.username,
            known_as: user.known_as,
            gender: user.gender,
            created: user.created_at,
            last_active: user.last_active,
            introduction: user.introduction,
            looking_for: user.looking_for,
            interests: user.interests,
            city: user.city,
            country: user.country,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageSummary {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_username: String,
    pub sender_photo_url: Option<String>,
    pub recipient_id: Uuid,
    pub recipient_username: String,
    pub recipient_photo_url: Option<String>,
    pub content: String,
    pub date_read: Option<DateTime<Utc>>,
    pub message_sent: DateTime<Utc>,
}

/// Entry in the moderation queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoForApproval {
    pub id: Uuid,
    pub url: String,
    pub username: String,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Column codecs
// ---------------------------------------------------------------------------

/// Current time at the precision timestamps are stored with.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 so lexical order in SQLite matches time order.
pub(crate) fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_ts(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

pub(crate) fn parse_date(idx: usize, s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

pub(crate) fn parse_uuid(idx: usize, s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

/// Completed years between `dob` and `today`.
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> u32 {
    let mut age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    u32::try_from(age).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn age_counts_completed_years() {
        let today = date(2024, 6, 15);
        assert_eq!(age_on(date(1990, 6, 15), today), 34);
        assert_eq!(age_on(date(1990, 6, 16), today), 33);
        assert_eq!(age_on(date(2000, 2, 29), date(2024, 2, 28)), 23);
        assert_eq!(age_on(date(2030, 1, 1), today), 0);
    }

    #[test]
    fn timestamps_sort_lexically() {
        let early = parse_ts(0, "2024-01-01T10:00:00.000001Z").unwrap();
        let late = parse_ts(0, "2024-01-01T10:00:00.5Z").unwrap();
        assert!(format_ts(&early) < format_ts(&late));
        assert_eq!(format_ts(&late), "2024-01-01T10:00:00.500000Z");
    }

    #[test]
    fn member_summary_picks_main_photo_url() {
        let user = User {
            id: Uuid::new_v4(),
            username: "lisa".into(),
            known_as: "Lisa".into(),
            gender: "female".into(),
            date_of_birth: date(1995, 3, 1),
            created_at: now(),
            last_active: now(),
            introduction: None,
            looking_for: None,
            interests: None,
            city: Some("Leeds".into()),
            country: None,
        };
        let photo = |is_main| Photo {
            id: Uuid::new_v4(),
            user_id: user.id,
            url: format!("https://cdn/{is_main}"),
            public_id: None,
            is_main,
            is_approved: true,
            created_at: now(),
        };
        let photos = vec![photo(false), photo(true)];

        let summary = MemberSummary::project(user, &photos, date(2025, 3, 1));
        assert_eq!(summary.age, 30);
        assert_eq!(summary.photo_url.as_deref(), Some("https://cdn/true"));
        assert_eq!(summary.photos.len(), 2);
    }
}
