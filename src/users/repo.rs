use sqlx::PgPool;
use uuid::Uuid;

use crate::users::error::UserRepoError;
use crate::users::model::{PreparedChanges, User, UserInsert};

const USER_COLUMNS: &str = "id, username, email, fullname, avatar, cover_image, \
     password_hash, refresh_token, created_at, updated_at";

impl User {
    /// Insert a fresh row. Duplicate username/email surface as the
    /// corresponding domain error.
    pub async fn create(db: &PgPool, insert: &UserInsert) -> Result<User, UserRepoError> {
        let sql = format!(
            r#"
            INSERT INTO users (username, email, fullname, avatar, cover_image, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&insert.username)
            .bind(&insert.email)
            .bind(&insert.fullname)
            .bind(&insert.avatar)
            .bind(&insert.cover_image)
            .bind(&insert.password_hash)
            .fetch_one(db)
            .await
            .map_err(UserRepoError::from_sqlx)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, UserRepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await?)
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, UserRepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(db)
            .await?)
    }

    pub async fn find_by_username(
        db: &PgPool,
        username: &str,
    ) -> Result<Option<User>, UserRepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(db)
            .await?)
    }

    /// Apply a prepared change set. Columns outside the change set keep
    /// their stored value; in particular `password_hash` is only written
    /// when the pre-persist step produced a new hash.
    pub async fn update(
        db: &PgPool,
        id: Uuid,
        changes: &PreparedChanges,
    ) -> Result<User, UserRepoError> {
        let sql = format!(
            r#"
            UPDATE users SET
                fullname = COALESCE($2, fullname),
                avatar = COALESCE($3, avatar),
                cover_image = CASE WHEN $4 THEN $5 ELSE cover_image END,
                password_hash = COALESCE($6, password_hash),
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(&changes.fullname)
            .bind(&changes.avatar)
            .bind(changes.cover_image.is_some())
            .bind(changes.cover_image.clone().flatten())
            .bind(&changes.password_hash)
            .fetch_optional(db)
            .await?
            .ok_or(UserRepoError::NotFound)
    }

    /// Store the current refresh token, or clear it with `None` on logout.
    pub async fn set_refresh_token(
        db: &PgPool,
        id: Uuid,
        token: Option<&str>,
    ) -> Result<(), UserRepoError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET refresh_token = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token)
        .execute(db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(UserRepoError::NotFound);
        }
        Ok(())
    }

    /// Append a video reference at the tail of the user's watch history.
    pub async fn push_watch_history(
        db: &PgPool,
        user_id: Uuid,
        video_id: Uuid,
    ) -> Result<(), UserRepoError> {
        sqlx::query(
            r#"
            INSERT INTO watch_history (user_id, position, video_id)
            SELECT $1, COALESCE(MAX(position), 0) + 1, $2
            FROM watch_history
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(video_id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Video references in watch order.
    pub async fn watch_history(db: &PgPool, user_id: Uuid) -> Result<Vec<Uuid>, UserRepoError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT video_id FROM watch_history
            WHERE user_id = $1
            ORDER BY position
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
