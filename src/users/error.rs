use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserRepoError {
    #[error("username already taken")]
    DuplicateUsername,

    #[error("email already registered")]
    DuplicateEmail,

    #[error("user not found")]
    NotFound,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl UserRepoError {
    /// Maps unique-constraint violations onto their domain variants;
    /// everything else stays a database error.
    pub(crate) fn from_sqlx(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return match db_err.constraint() {
                    Some("users_username_key") => UserRepoError::DuplicateUsername,
                    Some("users_email_key") => UserRepoError::DuplicateEmail,
                    _ => UserRepoError::Database(e),
                };
            }
        }
        UserRepoError::Database(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct FakeUniqueViolation(&'static str);

    impl fmt::Display for FakeUniqueViolation {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(
                f,
                "duplicate key value violates unique constraint \"{}\"",
                self.0
            )
        }
    }

    impl StdError for FakeUniqueViolation {}

    impl DatabaseError for FakeUniqueViolation {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }

        fn constraint(&self) -> Option<&str> {
            Some(self.0)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }
    }

    fn unique_violation(constraint: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(FakeUniqueViolation(constraint)))
    }

    #[test]
    fn duplicate_username_maps_to_domain_error() {
        assert!(matches!(
            UserRepoError::from_sqlx(unique_violation("users_username_key")),
            UserRepoError::DuplicateUsername
        ));
    }

    #[test]
    fn duplicate_email_maps_to_domain_error() {
        assert!(matches!(
            UserRepoError::from_sqlx(unique_violation("users_email_key")),
            UserRepoError::DuplicateEmail
        ));
    }

    #[test]
    fn unrelated_unique_constraint_stays_database_error() {
        assert!(matches!(
            UserRepoError::from_sqlx(unique_violation("watch_history_pkey")),
            UserRepoError::Database(_)
        ));
    }

    #[test]
    fn non_database_errors_pass_through() {
        assert!(matches!(
            UserRepoError::from_sqlx(sqlx::Error::RowNotFound),
            UserRepoError::Database(_)
        ));
    }
}
