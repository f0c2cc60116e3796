use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

pub mod entry;
pub mod user;

pub use entry::{clip_note, TimeEntry, MAX_NOTE_LEN};
pub use user::User;

/// Wall-clock datetime format used for clock-in/out values everywhere they
/// cross the wire: API payloads and backup documents.
pub const NAIVE_DATETIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// Calendar date format for pay-period bounds.
pub const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

time::serde::format_description!(
    pub naive_datetime,
    PrimitiveDateTime,
    "[year]-[month]-[day]T[hour]:[minute]:[second]"
);

time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");

/// Current server wall-clock time with the zone stripped. Clock fields are
/// stored zone-less, so the server is expected to run in the timezone the
/// workforce is paid in (UTC by convention).
pub fn now_naive() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn naive_datetime_format_round_trips() {
        let dt = datetime!(2024-01-01 09:00:00);
        let s = dt.format(NAIVE_DATETIME_FORMAT).unwrap();
        assert_eq!(s, "2024-01-01T09:00:00");
        let back = PrimitiveDateTime::parse(&s, NAIVE_DATETIME_FORMAT).unwrap();
        assert_eq!(back, dt);
    }

    #[test]
    fn date_format_round_trips() {
        let d = time::macros::date!(2024 - 03 - 15);
        let s = d.format(DATE_FORMAT).unwrap();
        assert_eq!(s, "2024-03-15");
        assert_eq!(time::Date::parse(&s, DATE_FORMAT).unwrap(), d);
    }

    #[test]
    fn naive_datetime_rejects_offset_suffix() {
        assert!(PrimitiveDateTime::parse("2024-01-01T09:00:00Z", NAIVE_DATETIME_FORMAT).is_err());
    }
}
