//! User lookups and profile mutations.
//!
//! Users are created by the identity subsystem; [`UnitOfWork::insert_user`]
//! is the boundary it (and the seed importer) calls.

use amity_shared::{AmityError, Role};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{self, NewUser, ProfileUpdate, User};
use crate::unit_of_work::UnitOfWork;

pub(crate) const USER_COLUMNS: &str = "u.id, u.username, u.known_as, u.gender, u.date_of_birth, u.created_at,
     u.last_active, u.introduction, u.looking_for, u.interests, u.city, u.country";

/// Look up a user by username, case-insensitively.
pub fn user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.username = ?1"),
            params![username],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

/// Like [`user_by_username`], but a missing user is a `NotFound` error.
pub fn require_user(conn: &Connection, username: &str) -> Result<User> {
    user_by_username(conn, username)?
        .ok_or_else(|| AmityError::not_found(format!("user '{username}'")).into())
}

pub fn roles_for_user(conn: &Connection, user_id: Uuid) -> Result<Vec<Role>> {
    let mut stmt = conn.prepare("SELECT role FROM user_roles WHERE user_id = ?1 ORDER BY role")?;
    let rows = stmt.query_map(params![user_id.to_string()], |row| row.get::<_, String>(0))?;

    let mut roles = Vec::new();
    for row in rows {
        let tag = row?;
        match Role::from_tag(&tag) {
            Some(role) => roles.push(role),
            None => tracing::warn!(user_id = %user_id, tag = %tag, "ignoring unknown role tag"),
        }
    }
    Ok(roles)
}

pub fn count_users(conn: &Connection) -> Result<u64> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    Ok(u64::try_from(n).unwrap_or(0))
}

impl UnitOfWork<'_> {
    /// Create a user with its role tags.
    ///
    /// The stored username is folded with ASCII rules only, the same rules
    /// SQLite's `NOCASE` collation applies on lookup.
    pub fn insert_user(&mut self, new_user: &NewUser) -> Result<User> {
        let username = new_user.username.trim();
        if username.is_empty() {
            return Err(AmityError::validation("username is required").into());
        }
        if user_by_username(self.conn(), username)?.is_some() {
            return Err(AmityError::validation(format!("username '{username}' is taken")).into());
        }

        let now = models::now();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_ascii_lowercase(),
            known_as: new_user.known_as.clone(),
            gender: new_user.gender.clone(),
            date_of_birth: new_user.date_of_birth,
            created_at: now,
            last_active: now,
            introduction: None,
            looking_for: None,
            interests: None,
            city: new_user.city.clone(),
            country: new_user.country.clone(),
        };

        self.stage(
            "INSERT INTO users (id, username, known_as, gender, date_of_birth, created_at, last_active, city, country)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                user.id.to_string(),
                user.username,
                user.known_as,
                user.gender,
                models::format_date(user.date_of_birth),
                models::format_ts(&user.created_at),
                models::format_ts(&user.last_active),
                user.city,
                user.country,
            ],
        )?;

        for role in &new_user.roles {
            self.stage(
                "INSERT OR IGNORE INTO user_roles (user_id, role) VALUES (?1, ?2)",
                params![user.id.to_string(), role.as_str()],
            )?;
        }

        tracing::info!(user_id = %user.id, username = %user.username, "user created");
        Ok(user)
    }

    /// Overwrite the editable profile fields of `username`.
    pub fn update_profile(&mut self, username: &str, update: &ProfileUpdate) -> Result<()> {
        let user = require_user(self.conn(), username)?;
        self.stage(
            "UPDATE users
             SET introduction = ?1, looking_for = ?2, interests = ?3, city = ?4, country = ?5
             WHERE id = ?6",
            params![
                update.introduction,
                update.looking_for,
                update.interests,
                update.city,
                update.country,
                user.id.to_string(),
            ],
        )?;
        tracing::debug!(username = %user.username, "profile updated");
        Ok(())
    }

    /// Stamp the user's last-active time with now.
    pub fn record_activity(&mut self, user_id: Uuid) -> Result<()> {
        self.stage(
            "UPDATE users SET last_active = ?1 WHERE id = ?2",
            params![models::format_ts(&models::now()), user_id.to_string()],
        )?;
        Ok(())
    }
}

/// Map a row selected with [`USER_COLUMNS`] to a [`User`].
pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id_str: String = row.get(0)?;
    let dob_str: String = row.get(4)?;
    let created_str: String = row.get(5)?;
    let active_str: String = row.get(6)?;

    Ok(User {
        id: models::parse_uuid(0, &id_str)?,
        username: row.get(1)?,
        known_as: row.get(2)?,
        gender: row.get(3)?,
        date_of_birth: models::parse_date(4, &dob_str)?,
        created_at: models::parse_ts(5, &created_str)?,
        last_active: models::parse_ts(6, &active_str)?,
        introduction: row.get(7)?,
        looking_for: row.get(8)?,
        interests: row.get(9)?,
        city: row.get(10)?,
        country: row.get(11)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::Database;
    use chrono::NaiveDate;

    pub(crate) fn new_user(username: &str, gender: &str, dob: (i32, u32, u32)) -> NewUser {
        NewUser {
            username: username.to_string(),
            known_as: username.to_string(),
            gender: gender.to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(dob.0, dob.1, dob.2).unwrap(),
            city: None,
            country: None,
            roles: vec![Role::Member],
        }
    }

    pub(crate) fn create_user(db: &mut Database, username: &str, gender: &str) -> User {
        let mut uow = db.unit_of_work().unwrap();
        let user = uow.insert_user(&new_user(username, gender, (1992, 5, 17))).unwrap();
        assert!(uow.complete().unwrap());
        user
    }

    #[test]
    fn username_lookup_ignores_case() {
        let mut db = Database::open_in_memory().unwrap();
        let ann = create_user(&mut db, "Ann", "female");

        assert_eq!(ann.username, "ann");
        let found = user_by_username(db.conn(), "ANN").unwrap().unwrap();
        assert_eq!(found.id, ann.id);
        assert!(user_by_username(db.conn(), "bob").unwrap().is_none());
    }

    #[test]
    fn non_ascii_usernames_fold_like_the_collation() {
        let mut db = Database::open_in_memory().unwrap();
        let emile = create_user(&mut db, "ÉMile", "male");

        assert_eq!(emile.username, "Émile");
        let found = user_by_username(db.conn(), "ÉMILE").unwrap().unwrap();
        assert_eq!(found.id, emile.id);
        assert_eq!(found.username, emile.username);
        // non-ASCII letters compare exactly
        assert!(user_by_username(db.conn(), "émile").unwrap().is_none());

        let mut uow = db.unit_of_work().unwrap();
        let err = uow.insert_user(&new_user("ÉMILE", "male", (1990, 1, 1))).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let mut db = Database::open_in_memory().unwrap();
        create_user(&mut db, "ann", "female");

        let mut uow = db.unit_of_work().unwrap();
        let err = uow.insert_user(&new_user("ANN", "female", (1990, 1, 1))).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn require_user_reports_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(require_user(db.conn(), "ghost").unwrap_err().is_not_found());
    }

    #[test]
    fn roles_are_stored_as_tags() {
        let mut db = Database::open_in_memory().unwrap();
        let mut uow = db.unit_of_work().unwrap();
        let mut admin = new_user("admin", "male", (1980, 1, 1));
        admin.roles = vec![Role::Admin, Role::Moderator];
        let user = uow.insert_user(&admin).unwrap();
        uow.complete().unwrap();

        let roles = roles_for_user(db.conn(), user.id).unwrap();
        assert_eq!(roles, vec![Role::Admin, Role::Moderator]);
    }

    #[test]
    fn update_profile_overwrites_fields() {
        let mut db = Database::open_in_memory().unwrap();
        create_user(&mut db, "ann", "female");

        let update = ProfileUpdate {
            introduction: Some("hello".into()),
            city: Some("York".into()),
            ..Default::default()
        };
        let mut uow = db.unit_of_work().unwrap();
        uow.update_profile("ann", &update).unwrap();
        assert!(uow.complete().unwrap());

        let ann = user_by_username(db.conn(), "ann").unwrap().unwrap();
        assert_eq!(ann.introduction.as_deref(), Some("hello"));
        assert_eq!(ann.city.as_deref(), Some("York"));
        assert_eq!(ann.gender, "female");
    }

    #[test]
    fn record_activity_moves_last_active_forward() {
        let mut db = Database::open_in_memory().unwrap();
        let ann = create_user(&mut db, "ann", "female");
        db.conn()
            .execute(
                "UPDATE users SET last_active = '2000-01-01T00:00:00.000000Z' WHERE id = ?1",
                params![ann.id.to_string()],
            )
            .unwrap();

        let mut uow = db.unit_of_work().unwrap();
        uow.record_activity(ann.id).unwrap();
        uow.complete().unwrap();

        let ann = user_by_username(db.conn(), "ann").unwrap().unwrap();
        assert!(ann.last_active > ann.created_at - chrono::Duration::days(1));
        assert_eq!(count_users(db.conn()).unwrap(), 1);
    }
}
