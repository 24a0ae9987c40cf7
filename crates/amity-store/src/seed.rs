//! First-run import of member data from a JSON document.
//!
//! The document is an array of users. Each user's photos are imported
//! already approved, with the first one as main, and without a remote
//! identifier so they are never deleted from remote storage.

use amity_shared::Role;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;
use crate::models::{self, NewUser, Photo, ProfileUpdate};
use crate::users;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedUser {
    username: String,
    known_as: String,
    gender: String,
    date_of_birth: NaiveDate,
    #[serde(default)]
    introduction: Option<String>,
    #[serde(default)]
    looking_for: Option<String>,
    #[serde(default)]
    interests: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    roles: Option<Vec<Role>>,
    #[serde(default)]
    photos: Vec<SeedPhoto>,
}

#[derive(Debug, Deserialize)]
struct SeedPhoto {
    url: String,
}

/// Import `json` if the database has no users yet. Returns how many users
/// were created; an already populated database is left alone and yields 0.
pub fn seed_users(db: &mut Database, json: &str) -> Result<usize> {
    if users::count_users(db.conn())? > 0 {
        tracing::debug!("users present, skipping seed import");
        return Ok(0);
    }

    let seed: Vec<SeedUser> = serde_json::from_str(json)?;

    let mut uow = db.unit_of_work()?;
    for entry in &seed {
        let new_user = NewUser {
            username: entry.username.clone(),
            known_as: entry.known_as.clone(),
            gender: entry.gender.clone(),
            date_of_birth: entry.date_of_birth,
            city: entry.city.clone(),
            country: entry.country.clone(),
            roles: entry.roles.clone().unwrap_or_else(|| vec![Role::Member]),
        };
        let user = uow.insert_user(&new_user)?;

        uow.update_profile(
            &user.username,
            &ProfileUpdate {
                introduction: entry.introduction.clone(),
                looking_for: entry.looking_for.clone(),
                interests: entry.interests.clone(),
                city: entry.city.clone(),
                country: entry.country.clone(),
            },
        )?;

        for (i, seed_photo) in entry.photos.iter().enumerate() {
            uow.insert_photo(&Photo {
                id: Uuid::new_v4(),
                user_id: user.id,
                url: seed_photo.url.clone(),
                public_id: None,
                is_main: i == 0,
                is_approved: true,
                created_at: models::now(),
            })?;
        }
    }
    uow.complete()?;

    tracing::info!(users = seed.len(), "seed data imported");
    Ok(seed.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photos::{self, PhotoVisibility};

    const SEED: &str = r#"[
        {
            "username": "Lisa",
            "knownAs": "Lisa",
            "gender": "female",
            "dateOfBirth": "1994-07-22",
            "introduction": "Hi there",
            "city": "Leeds",
            "country": "UK",
            "photos": [{ "url": "https://seed.test/lisa-1.jpg" }, { "url": "https://seed.test/lisa-2.jpg" }]
        },
        {
            "username": "admin",
            "knownAs": "Admin",
            "gender": "male",
            "dateOfBirth": "1980-01-01",
            "roles": ["Admin", "Moderator"]
        }
    ]"#;

    #[test]
    fn imports_users_roles_and_approved_photos() {
        let mut db = Database::open_in_memory().unwrap();
        assert_eq!(seed_users(&mut db, SEED).unwrap(), 2);

        let lisa = users::user_by_username(db.conn(), "lisa").unwrap().unwrap();
        assert_eq!(lisa.introduction.as_deref(), Some("Hi there"));
        assert_eq!(users::roles_for_user(db.conn(), lisa.id).unwrap(), vec![Role::Member]);

        let photos = photos::photos_for_user(db.conn(), lisa.id, PhotoVisibility::Public).unwrap();
        assert_eq!(photos.len(), 2);
        assert!(photos.iter().all(|p| p.is_approved && p.public_id.is_none()));
        let main = photos::main_photo(db.conn(), lisa.id).unwrap().unwrap();
        assert_eq!(main.url, "https://seed.test/lisa-1.jpg");

        let admin = users::user_by_username(db.conn(), "admin").unwrap().unwrap();
        assert_eq!(
            users::roles_for_user(db.conn(), admin.id).unwrap(),
            vec![Role::Admin, Role::Moderator]
        );
    }

    #[test]
    fn populated_database_is_not_reseeded() {
        let mut db = Database::open_in_memory().unwrap();
        seed_users(&mut db, SEED).unwrap();
        assert_eq!(seed_users(&mut db, SEED).unwrap(), 0);
        assert_eq!(users::count_users(db.conn()).unwrap(), 2);
    }

    #[test]
    fn malformed_document_is_rejected_without_writes() {
        let mut db = Database::open_in_memory().unwrap();
        let err = seed_users(&mut db, r#"[{"username": "x"}]"#).unwrap_err();
        assert!(err.kind().to_string().contains("missing field"));
        assert_eq!(users::count_users(db.conn()).unwrap(), 0);
    }
}
