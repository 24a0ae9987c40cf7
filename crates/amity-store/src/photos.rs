//! Photo moderation and main-photo selection.
//!
//! Invariants: a user has at most one main photo, and only an approved photo
//! can be main. The schema backs both up (partial unique index and CHECK), so
//! a buggy caller gets a constraint error instead of corrupt state.

use amity_shared::AmityError;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{self, Photo};
use crate::storage::PhotoStorage;
use crate::unit_of_work::UnitOfWork;
use crate::users;

const PHOTO_COLUMNS: &str = "p.id, p.user_id, p.url, p.public_id, p.is_main, p.is_approved, p.created_at";

/// Which photos a read path may return.
///
/// Every photo query takes one of these; there is no unfiltered read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoVisibility {
    /// Anyone other than the owner: approved photos only.
    Public,
    /// The owner looking at their own profile: everything.
    Owner,
    /// The moderation queue: unapproved photos only.
    Moderation,
}

impl PhotoVisibility {
    /// SQL predicate over the photo table aliased as `alias`.
    pub fn predicate(self, alias: &str) -> String {
        match self {
            Self::Public => format!("{alias}.is_approved = 1"),
            Self::Owner => "1 = 1".to_string(),
            Self::Moderation => format!("{alias}.is_approved = 0"),
        }
    }

    /// Owner visibility when the viewer is the owner, public otherwise.
    pub fn for_viewer(owner: &str, viewer: &str) -> Self {
        if owner.eq_ignore_ascii_case(viewer) {
            Self::Owner
        } else {
            Self::Public
        }
    }
}

/// Photos of a user, oldest first, filtered by `visibility`.
pub fn photos_for_user(conn: &Connection, user_id: Uuid, visibility: PhotoVisibility) -> Result<Vec<Photo>> {
    let sql = format!(
        "SELECT {PHOTO_COLUMNS} FROM photos p
         WHERE p.user_id = ?1 AND {}
         ORDER BY p.created_at ASC, p.rowid ASC",
        visibility.predicate("p")
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id.to_string()], row_to_photo)?;

    let mut photos = Vec::new();
    for row in rows {
        photos.push(row?);
    }
    Ok(photos)
}

/// A single photo by id, regardless of owner, filtered by `visibility`.
pub fn photo_by_id(conn: &Connection, photo_id: Uuid, visibility: PhotoVisibility) -> Result<Option<Photo>> {
    let sql = format!(
        "SELECT {PHOTO_COLUMNS} FROM photos p WHERE p.id = ?1 AND {}",
        visibility.predicate("p")
    );
    let photo = conn
        .query_row(&sql, params![photo_id.to_string()], row_to_photo)
        .optional()?;
    Ok(photo)
}

/// The user's current main photo, if any.
pub fn main_photo(conn: &Connection, user_id: Uuid) -> Result<Option<Photo>> {
    let photo = conn
        .query_row(
            &format!("SELECT {PHOTO_COLUMNS} FROM photos p WHERE p.user_id = ?1 AND p.is_main = 1"),
            params![user_id.to_string()],
            row_to_photo,
        )
        .optional()?;
    Ok(photo)
}

/// Find `photo_id` among the owner's photos or fail with `NotFound`.
fn owned_photo(conn: &Connection, user_id: Uuid, photo_id: Uuid) -> Result<Photo> {
    photos_for_user(conn, user_id, PhotoVisibility::Owner)?
        .into_iter()
        .find(|p| p.id == photo_id)
        .ok_or_else(|| AmityError::not_found(format!("photo {photo_id}")).into())
}

impl UnitOfWork<'_> {
    /// Upload `data` and attach it to the user as an unapproved, non-main
    /// photo.
    ///
    /// An upload failure is returned verbatim as an upstream error and
    /// nothing is staged.
    pub async fn add_photo<S: PhotoStorage>(&mut self, username: &str, storage: &S, data: Bytes) -> Result<Photo> {
        let user = users::require_user(self.conn(), username)?;

        let stored = storage
            .upload(data)
            .await
            .map_err(|e| AmityError::upstream(e.0))?;

        let photo = Photo {
            id: Uuid::new_v4(),
            user_id: user.id,
            url: stored.url,
            public_id: Some(stored.public_id),
            is_main: false,
            is_approved: false,
            created_at: models::now(),
        };
        self.insert_photo(&photo)?;

        tracing::info!(photo_id = %photo.id, username = %user.username, "photo added, awaiting approval");
        Ok(photo)
    }

    pub(crate) fn insert_photo(&mut self, photo: &Photo) -> Result<()> {
        self.stage(
            "INSERT INTO photos (id, user_id, url, public_id, is_main, is_approved, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                photo.id.to_string(),
                photo.user_id.to_string(),
                photo.url,
                photo.public_id,
                photo.is_main,
                photo.is_approved,
                models::format_ts(&photo.created_at),
            ],
        )?;
        Ok(())
    }

    /// Make `photo_id` the user's main photo.
    ///
    /// The old main is cleared and the new one set in this unit of work, so
    /// a commit never shows zero or two main photos. Concurrent swaps from
    /// separate connections are not serialized here: the last commit wins.
    pub fn set_main_photo(&mut self, username: &str, photo_id: Uuid) -> Result<()> {
        let user = users::require_user(self.conn(), username)?;
        let photo = owned_photo(self.conn(), user.id, photo_id)?;

        if photo.is_main {
            return Err(AmityError::invalid_state("This is already your main photo").into());
        }
        if !photo.is_approved {
            return Err(AmityError::invalid_state("You cannot set an unapproved photo as main").into());
        }

        self.stage(
            "UPDATE photos SET is_main = 0 WHERE user_id = ?1 AND is_main = 1",
            params![user.id.to_string()],
        )?;
        self.stage(
            "UPDATE photos SET is_main = 1 WHERE id = ?1",
            params![photo.id.to_string()],
        )?;

        tracing::info!(photo_id = %photo.id, username = %user.username, "main photo changed");
        Ok(())
    }

    /// Delete one of the user's photos.
    ///
    /// Remote storage is asked first; if it refuses, local state is left
    /// untouched. If the unit of work is never completed afterwards, the
    /// remote object is already gone and the local row stays.
    pub async fn delete_photo<S: PhotoStorage>(&mut self, username: &str, photo_id: Uuid, storage: &S) -> Result<()> {
        let user = users::require_user(self.conn(), username)?;
        let photo = owned_photo(self.conn(), user.id, photo_id)?;

        if photo.is_main {
            return Err(AmityError::invalid_state("You cannot delete your main photo").into());
        }

        self.remove_photo(photo, storage).await?;
        tracing::info!(photo_id = %photo_id, username = %user.username, "photo deleted");
        Ok(())
    }

    /// Remote-then-local removal shared by owner deletion and rejection.
    pub(crate) async fn remove_photo<S: PhotoStorage>(&mut self, photo: Photo, storage: &S) -> Result<()> {
        if let Some(public_id) = &photo.public_id {
            storage
                .delete(public_id)
                .await
                .map_err(|e| AmityError::upstream(e.0))?;
        }

        self.stage("DELETE FROM photos WHERE id = ?1", params![photo.id.to_string()])?;
        Ok(())
    }
}

/// Map a row selected with `PHOTO_COLUMNS` to a [`Photo`].
pub(crate) fn row_to_photo(row: &rusqlite::Row<'_>) -> rusqlite::Result<Photo> {
    let id_str: String = row.get(0)?;
    let user_id_str: String = row.get(1)?;
    let created_str: String = row.get(6)?;

    Ok(Photo {
        id: models::parse_uuid(0, &id_str)?,
        user_id: models::parse_uuid(1, &user_id_str)?,
        url: row.get(2)?,
        public_id: row.get(3)?,
        is_main: row.get(4)?,
        is_approved: row.get(5)?,
        created_at: models::parse_ts(6, &created_str)?,
    })
}
