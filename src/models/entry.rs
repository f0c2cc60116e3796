use sqlx::{FromRow, PgPool};
use time::{OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

/// Notes are capped at this many characters on every write path.
pub const MAX_NOTE_LEN: usize = 200;

/// A single work session. `clock_out` is `NULL` while the session is open;
/// at most one open session may exist per user.
#[derive(Debug, Clone, FromRow)]
pub struct TimeEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub clock_in: PrimitiveDateTime,
    pub clock_out: Option<PrimitiveDateTime>,
    pub note: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TimeEntry {
    /// Hours worked; 0.0 while the session is still open.
    pub fn duration_hours(&self) -> f64 {
        match self.clock_out {
            Some(out) => (out - self.clock_in).as_seconds_f64() / 3600.0,
            None => 0.0,
        }
    }

    /// "8h 05m" style rendering used in clock-out confirmations.
    pub fn duration_display(&self) -> String {
        let h = self.duration_hours();
        let hours = h as i64;
        let minutes = ((h - hours as f64) * 60.0) as i64;
        format!("{hours}h {minutes:02}m")
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<TimeEntry>> {
        let entry = sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT id, user_id, clock_in, clock_out, note, created_at, updated_at
            FROM time_entries
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(entry)
    }

    /// Entry scoped to its owner; other users' rows are invisible here.
    pub async fn find_for_user(
        db: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<TimeEntry>> {
        let entry = sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT id, user_id, clock_in, clock_out, note, created_at, updated_at
            FROM time_entries
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(entry)
    }

    /// The user's open session, if any.
    pub async fn active_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<TimeEntry>> {
        let entry = sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT id, user_id, clock_in, clock_out, note, created_at, updated_at
            FROM time_entries
            WHERE user_id = $1 AND clock_out IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(entry)
    }

    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        clock_in: PrimitiveDateTime,
        clock_out: Option<PrimitiveDateTime>,
        note: &str,
    ) -> anyhow::Result<TimeEntry> {
        let entry = sqlx::query_as::<_, TimeEntry>(
            r#"
            INSERT INTO time_entries (user_id, clock_in, clock_out, note)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, clock_in, clock_out, note, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(clock_in)
        .bind(clock_out)
        .bind(note)
        .fetch_one(db)
        .await?;
        Ok(entry)
    }

    pub async fn update(
        db: &PgPool,
        id: Uuid,
        clock_in: PrimitiveDateTime,
        clock_out: Option<PrimitiveDateTime>,
        note: &str,
    ) -> anyhow::Result<TimeEntry> {
        let entry = sqlx::query_as::<_, TimeEntry>(
            r#"
            UPDATE time_entries
            SET clock_in = $2, clock_out = $3, note = $4, updated_at = now()
            WHERE id = $1
            RETURNING id, user_id, clock_in, clock_out, note, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(clock_in)
        .bind(clock_out)
        .bind(note)
        .fetch_one(db)
        .await?;
        Ok(entry)
    }

    pub async fn close(
        db: &PgPool,
        id: Uuid,
        clock_out: PrimitiveDateTime,
    ) -> anyhow::Result<TimeEntry> {
        let entry = sqlx::query_as::<_, TimeEntry>(
            r#"
            UPDATE time_entries
            SET clock_out = $2, updated_at = now()
            WHERE id = $1
            RETURNING id, user_id, clock_in, clock_out, note, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(clock_out)
        .fetch_one(db)
        .await?;
        Ok(entry)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM time_entries WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn recent_for_user(
        db: &PgPool,
        user_id: Uuid,
        limit: i64,
    ) -> anyhow::Result<Vec<TimeEntry>> {
        let rows = sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT id, user_id, clock_in, clock_out, note, created_at, updated_at
            FROM time_entries
            WHERE user_id = $1
            ORDER BY clock_in DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Finished sessions clocked in on or after `since`. Open sessions do
    /// not count toward accrued hours.
    pub async fn finished_since(
        db: &PgPool,
        user_id: Uuid,
        since: PrimitiveDateTime,
    ) -> anyhow::Result<Vec<TimeEntry>> {
        let rows = sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT id, user_id, clock_in, clock_out, note, created_at, updated_at
            FROM time_entries
            WHERE user_id = $1 AND clock_in >= $2 AND clock_out IS NOT NULL
            ORDER BY clock_in
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Finished sessions clocked in inside `[start, end]` (both inclusive).
    pub async fn finished_in_range(
        db: &PgPool,
        user_id: Uuid,
        start: PrimitiveDateTime,
        end: PrimitiveDateTime,
    ) -> anyhow::Result<Vec<TimeEntry>> {
        let rows = sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT id, user_id, clock_in, clock_out, note, created_at, updated_at
            FROM time_entries
            WHERE user_id = $1 AND clock_in >= $2 AND clock_in <= $3
                  AND clock_out IS NOT NULL
            ORDER BY clock_in
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// All entries, optionally range-filtered on clock-in, newest first.
    /// Used by the per-user admin report.
    pub async fn list_for_user(
        db: &PgPool,
        user_id: Uuid,
        start: Option<PrimitiveDateTime>,
        end: Option<PrimitiveDateTime>,
    ) -> anyhow::Result<Vec<TimeEntry>> {
        let rows = sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT id, user_id, clock_in, clock_out, note, created_at, updated_at
            FROM time_entries
            WHERE user_id = $1
                  AND ($2::timestamp IS NULL OR clock_in >= $2)
                  AND ($3::timestamp IS NULL OR clock_in <= $3)
            ORDER BY clock_in DESC
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// All entries in insertion order, for backup export.
    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<TimeEntry>> {
        let rows = sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT id, user_id, clock_in, clock_out, note, created_at, updated_at
            FROM time_entries
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

/// Trim and cap a note to [`MAX_NOTE_LEN`] characters.
pub fn clip_note(note: &str) -> String {
    note.trim().chars().take(MAX_NOTE_LEN).collect()
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn entry(clock_in: PrimitiveDateTime, clock_out: Option<PrimitiveDateTime>) -> TimeEntry {
        let now = OffsetDateTime::now_utc();
        TimeEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            clock_in,
            clock_out,
            note: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn duration_of_finished_session() {
        let e = entry(
            datetime!(2024-01-01 09:00:00),
            Some(datetime!(2024-01-01 17:00:00)),
        );
        assert!((e.duration_hours() - 8.0).abs() < 1e-9);
        assert_eq!(e.duration_display(), "8h 00m");
    }

    #[test]
    fn duration_of_open_session_is_zero() {
        let e = entry(datetime!(2024-01-01 09:00:00), None);
        assert_eq!(e.duration_hours(), 0.0);
        assert_eq!(e.duration_display(), "0h 00m");
    }

    #[test]
    fn duration_display_rounds_down_to_minutes() {
        let e = entry(
            datetime!(2024-01-01 09:00:00),
            Some(datetime!(2024-01-01 10:30:45)),
        );
        assert_eq!(e.duration_display(), "1h 30m");
    }

    #[test]
    fn clip_note_trims_and_caps() {
        assert_eq!(clip_note("  lunch break  "), "lunch break");
        let long = "x".repeat(MAX_NOTE_LEN + 50);
        assert_eq!(clip_note(&long).chars().count(), MAX_NOTE_LEN);
    }

    #[test]
    fn clip_note_respects_char_boundaries() {
        let long: String = "é".repeat(MAX_NOTE_LEN + 1);
        let clipped = clip_note(&long);
        assert_eq!(clipped.chars().count(), MAX_NOTE_LEN);
    }
}
