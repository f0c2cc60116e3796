use sqlx::PgPool;
use time::macros::time;
use time::{Date, Duration, PrimitiveDateTime, Time};

use crate::models::{TimeEntry, User};

/// Midnight at the start of the week (Monday) containing `now`.
pub fn week_start(now: PrimitiveDateTime) -> PrimitiveDateTime {
    let days = i64::from(now.date().weekday().number_days_from_monday());
    PrimitiveDateTime::new(now.date() - Duration::days(days), Time::MIDNIGHT)
}

pub fn start_of_day(date: Date) -> PrimitiveDateTime {
    PrimitiveDateTime::new(date, Time::MIDNIGHT)
}

/// Inclusive end bound for date-range filters.
pub fn end_of_day(date: Date) -> PrimitiveDateTime {
    PrimitiveDateTime::new(date, time!(23:59:59))
}

pub fn total_hours(entries: &[TimeEntry]) -> f64 {
    entries.iter().map(TimeEntry::duration_hours).sum()
}

/// Hours from finished sessions since the start of the current week.
pub async fn weekly_hours(
    db: &PgPool,
    user_id: uuid::Uuid,
    now: PrimitiveDateTime,
) -> anyhow::Result<f64> {
    let entries = TimeEntry::finished_since(db, user_id, week_start(now)).await?;
    Ok(total_hours(&entries))
}

/// Hours from finished sessions inside the user's configured pay period;
/// 0.0 when no period is configured.
pub async fn pay_period_hours(db: &PgPool, user: &User) -> anyhow::Result<f64> {
    let (Some(start), Some(end)) = (user.pay_period_start, user.pay_period_end) else {
        return Ok(0.0);
    };
    let entries =
        TimeEntry::finished_in_range(db, user.id, start_of_day(start), end_of_day(end)).await?;
    Ok(total_hours(&entries))
}
