use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// User record in the database. Created on first successful login; admin
/// status always comes from the configured allow-list, never from clients.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub provider: String,
    pub is_admin: bool,
    pub last_login: Option<OffsetDateTime>,
    pub pay_rate: f64,
    pub dark_mode: bool,
    pub pay_period_start: Option<Date>,
    pub pay_period_end: Option<Date>,
    pub created_at: OffsetDateTime,
}

impl User {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, provider, is_admin, last_login, pay_rate,
                   dark_mode, pay_period_start, pay_period_end, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create-or-refresh on login. Name, provider and last-login come from
    /// the identity provider; the admin flag is recomputed from the
    /// allow-list on every login.
    pub async fn upsert_login(
        db: &PgPool,
        email: &str,
        name: &str,
        provider: &str,
        is_admin: bool,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, provider, is_admin, last_login)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (email) DO UPDATE
            SET name = EXCLUDED.name,
                provider = EXCLUDED.provider,
                is_admin = EXCLUDED.is_admin,
                last_login = now()
            RETURNING id, email, name, provider, is_admin, last_login, pay_rate,
                      dark_mode, pay_period_start, pay_period_end, created_at
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(provider)
        .bind(is_admin)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// All users ordered by display name, for the admin dashboard and reports.
    pub async fn list_by_name(db: &PgPool) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, provider, is_admin, last_login, pay_rate,
                   dark_mode, pay_period_start, pay_period_end, created_at
            FROM users
            ORDER BY name, email
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// All users in insertion order, for backup export.
    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, provider, is_admin, last_login, pay_rate,
                   dark_mode, pay_period_start, pay_period_end, created_at
            FROM users
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn update_settings(
        db: &PgPool,
        id: Uuid,
        pay_rate: f64,
        dark_mode: bool,
        pay_period_start: Option<Date>,
        pay_period_end: Option<Date>,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET pay_rate = $2, dark_mode = $3, pay_period_start = $4, pay_period_end = $5
            WHERE id = $1
            RETURNING id, email, name, provider, is_admin, last_login, pay_rate,
                      dark_mode, pay_period_start, pay_period_end, created_at
            "#,
        )
        .bind(id)
        .bind(pay_rate)
        .bind(dark_mode)
        .bind(pay_period_start)
        .bind(pay_period_end)
        .fetch_one(db)
        .await?;
        Ok(user)
    }
}
