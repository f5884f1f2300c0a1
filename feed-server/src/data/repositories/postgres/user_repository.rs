use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::data::user_repository::{NewUser, UserCredentials, UserRepository};
use crate::domain::error::DomainError;
use crate::domain::user::User;

#[derive(Debug, Clone)]
pub(crate) struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    name: String,
    post_ids: Vec<i64>,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct UserCredentialsRow {
    id: i64,
    email: String,
    name: String,
    password_hash: String,
    post_ids: Vec<i64>,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create_user(&self, input: NewUser) -> Result<User, DomainError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (email, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, name, post_ids, created_at
            "#,
        )
        .bind(&input.email)
        .bind(&input.name)
        .bind(&input.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_user_db_error)?;

        map_row_to_user(row)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, DomainError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, name, post_ids, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_user_db_error)?;

        row.map(map_row_to_user).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>, DomainError> {
        let row = sqlx::query_as::<_, UserCredentialsRow>(
            r#"
            SELECT id, email, name, password_hash, post_ids, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_user_db_error)?;

        match row {
            Some(r) => {
                let user = User::new(r.id, r.email, r.name, r.post_ids, r.created_at)
                    .map_err(|err| DomainError::Internal(err.to_string()))?;
                Ok(Some(UserCredentials {
                    user,
                    password_hash: r.password_hash,
                }))
            }
            None => Ok(None),
        }
    }

    async fn append_post_ref(&self, user_id: i64, post_id: i64) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET post_ids = array_append(post_ids, $2)
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(post_id)
        .execute(&self.pool)
        .await
        .map_err(map_user_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!("user id: {user_id}")));
        }
        Ok(())
    }

    async fn remove_post_ref(&self, user_id: i64, post_id: i64) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET post_ids = array_remove(post_ids, $2)
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(post_id)
        .execute(&self.pool)
        .await
        .map_err(map_user_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!("user id: {user_id}")));
        }
        Ok(())
    }
}

fn map_row_to_user(row: UserRow) -> Result<User, DomainError> {
    User::new(row.id, row.email, row.name, row.post_ids, row.created_at)
        .map_err(|err| DomainError::Internal(err.to_string()))
}

fn map_user_db_error(err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.code().as_deref() == Some("23505")
    {
        let resource = match db_err.constraint() {
            Some("users_email_key") => "email",
            _ => "user",
        };
        return DomainError::AlreadyExists(resource.to_string());
    }
    DomainError::Internal(err.to_string())
}
