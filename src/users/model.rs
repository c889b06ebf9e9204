use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::password;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Input for registration. Carries the plaintext password until
/// [`NewUser::into_insert`] consumes it.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub password: String,
}

/// Columns of a fresh row, password already hashed.
#[derive(Debug)]
pub struct UserInsert {
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub password_hash: String,
}

impl NewUser {
    /// Trims every text field, lowercases `username` and `email`, and
    /// rejects malformed or empty required fields.
    pub fn normalized(mut self) -> anyhow::Result<Self> {
        self.username = self.username.trim().to_lowercase();
        self.email = self.email.trim().to_lowercase();
        self.fullname = self.fullname.trim().to_string();
        self.avatar = self.avatar.trim().to_string();
        if let Some(cover) = self.cover_image.as_mut() {
            *cover = cover.trim().to_string();
        }

        if self.username.is_empty() {
            anyhow::bail!("username is required");
        }
        if !is_valid_email(&self.email) {
            anyhow::bail!("invalid email");
        }
        if self.fullname.is_empty() {
            anyhow::bail!("fullname is required");
        }
        if self.avatar.is_empty() {
            anyhow::bail!("avatar is required");
        }
        if self.password.is_empty() {
            anyhow::bail!("password is required");
        }
        Ok(self)
    }

    /// Normalizes, then hashes the password and yields the insertable row.
    /// Runs [`NewUser::normalized`] itself, so a row can never be inserted
    /// un-normalized; this is also the only hashing point on the create
    /// path, so a row is hashed exactly once.
    pub fn into_insert(self) -> anyhow::Result<UserInsert> {
        let user = self.normalized()?;
        let password_hash = password::hash_password(&user.password)?;
        Ok(UserInsert {
            username: user.username,
            email: user.email,
            fullname: user.fullname,
            avatar: user.avatar,
            cover_image: user.cover_image,
            password_hash,
        })
    }
}

/// Explicit changed-fields set for an update. A field left as `None` is not
/// part of the change and its column is never touched. `cover_image` is
/// doubly optional so it can be cleared (`Some(None)`).
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub fullname: Option<String>,
    pub avatar: Option<String>,
    pub cover_image: Option<Option<String>>,
    pub password: Option<String>,
}

/// A change set after the pre-persist step: plaintext replaced by a hash,
/// or no hash at all when the password was not part of the change.
#[derive(Debug, Clone)]
pub struct PreparedChanges {
    pub fullname: Option<String>,
    pub avatar: Option<String>,
    pub cover_image: Option<Option<String>>,
    pub password_hash: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.fullname.is_none()
            && self.avatar.is_none()
            && self.cover_image.is_none()
            && self.password.is_none()
    }

    /// Pre-persist step: hashes the password only when this change set
    /// carries one. Re-saving without a password change therefore leaves the
    /// stored hash exactly as it was.
    pub fn prepare(self) -> anyhow::Result<PreparedChanges> {
        let password_hash = match self.password {
            Some(plain) => Some(password::hash_password(&plain)?),
            None => None,
        };
        Ok(PreparedChanges {
            fullname: self.fullname,
            avatar: self.avatar,
            cover_image: self.cover_image,
            password_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::password::verify_password;

    fn alice() -> NewUser {
        NewUser {
            username: "Alice ".into(),
            email: " Alice@X.com".into(),
            fullname: " Alice Example ".into(),
            avatar: "https://cdn.example/alice.png".into(),
            cover_image: None,
            password: "pw1".into(),
        }
    }

    #[test]
    fn normalize_lowercases_and_trims() {
        let user = alice().normalized().expect("valid input");
        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "alice@x.com");
        assert_eq!(user.fullname, "Alice Example");
    }

    #[test]
    fn normalize_rejects_bad_email() {
        let mut user = alice();
        user.email = "not-an-email".into();
        assert!(user.normalized().is_err());
    }

    #[test]
    fn normalize_rejects_missing_avatar() {
        let mut user = alice();
        user.avatar = "  ".into();
        assert!(user.normalized().is_err());
    }

    #[test]
    fn into_insert_hashes_the_password() {
        let insert = alice().normalized().unwrap().into_insert().unwrap();
        assert_ne!(insert.password_hash, "pw1");
        assert!(verify_password("pw1", &insert.password_hash).unwrap());
        assert!(!verify_password("pw2", &insert.password_hash).unwrap());
    }

    #[test]
    fn into_insert_normalizes_without_an_explicit_call() {
        let insert = alice().into_insert().expect("valid input");
        assert_eq!(insert.username, "alice");
        assert_eq!(insert.email, "alice@x.com");
        assert_eq!(insert.fullname, "Alice Example");
    }

    #[test]
    fn into_insert_rejects_invalid_input() {
        let mut user = alice();
        user.email = "not-an-email".into();
        assert!(user.into_insert().is_err());
    }

    #[test]
    fn prepare_without_password_change_leaves_hash_alone() {
        let changes = UserChanges {
            avatar: Some("https://cdn.example/new.png".into()),
            ..Default::default()
        };
        let prepared = changes.prepare().expect("prepare");
        assert!(prepared.password_hash.is_none());
        assert_eq!(prepared.avatar.as_deref(), Some("https://cdn.example/new.png"));
    }

    #[test]
    fn prepare_with_password_change_rehashes() {
        let changes = UserChanges {
            password: Some("new-secret".into()),
            ..Default::default()
        };
        let prepared = changes.prepare().expect("prepare");
        let hash = prepared.password_hash.expect("hash present");
        assert_ne!(hash, "new-secret");
        assert!(verify_password("new-secret", &hash).unwrap());
    }

    #[test]
    fn cover_image_can_be_cleared() {
        let changes = UserChanges {
            cover_image: Some(None),
            ..Default::default()
        };
        assert!(!changes.is_empty());
        let prepared = changes.prepare().unwrap();
        assert_eq!(prepared.cover_image, Some(None));
    }

    #[test]
    fn empty_change_set_is_empty() {
        assert!(UserChanges::default().is_empty());
    }
}
