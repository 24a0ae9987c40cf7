//! Moderation queue: review, approve and reject uploaded photos.

use amity_shared::AmityError;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{self, PhotoForApproval};
use crate::photos::{self, PhotoVisibility};
use crate::storage::PhotoStorage;
use crate::unit_of_work::UnitOfWork;

/// Every photo still awaiting review, oldest upload first.
pub fn photos_for_approval(conn: &Connection) -> Result<Vec<PhotoForApproval>> {
    let sql = format!(
        "SELECT p.id, p.url, u.username, p.is_approved, p.created_at
         FROM photos p JOIN users u ON u.id = p.user_id
         WHERE {}
         ORDER BY p.created_at ASC, p.rowid ASC",
        PhotoVisibility::Moderation.predicate("p")
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        let id_str: String = row.get(0)?;
        let created_str: String = row.get(4)?;
        Ok(PhotoForApproval {
            id: models::parse_uuid(0, &id_str)?,
            url: row.get(1)?,
            username: row.get(2)?,
            is_approved: row.get(3)?,
            created_at: models::parse_ts(4, &created_str)?,
        })
    })?;

    let mut queue = Vec::new();
    for row in rows {
        queue.push(row?);
    }
    Ok(queue)
}

impl UnitOfWork<'_> {
    /// Approve a photo. If its owner has no main photo yet, it becomes main.
    pub fn approve_photo(&mut self, photo_id: Uuid) -> Result<()> {
        let photo = photos::photo_by_id(self.conn(), photo_id, PhotoVisibility::Owner)?
            .ok_or_else(|| AmityError::not_found(format!("photo {photo_id}")))?;
        if photo.is_approved {
            return Err(AmityError::invalid_state("Photo is already approved").into());
        }

        let becomes_main = photos::main_photo(self.conn(), photo.user_id)?.is_none();
        self.stage(
            "UPDATE photos SET is_approved = 1, is_main = ?1 WHERE id = ?2",
            params![becomes_main, photo_id.to_string()],
        )?;

        tracing::info!(photo_id = %photo_id, user_id = %photo.user_id, becomes_main, "photo approved");
        Ok(())
    }

    /// Reject an unapproved photo, deleting it remotely and then locally.
    pub async fn reject_photo<S: PhotoStorage>(&mut self, photo_id: Uuid, storage: &S) -> Result<()> {
        let photo = photos::photo_by_id(self.conn(), photo_id, PhotoVisibility::Owner)?
            .ok_or_else(|| AmityError::not_found(format!("photo {photo_id}")))?;
        if photo.is_approved {
            return Err(AmityError::invalid_state("Only photos awaiting approval can be rejected").into());
        }

        self.remove_photo(photo, storage).await?;
        tracing::info!(photo_id = %photo_id, "photo rejected");
        Ok(())
    }
}
