use serde::{Deserialize, Serialize};
use time::{Date, PrimitiveDateTime};
use uuid::Uuid;

use crate::models::TimeEntry;

#[derive(Debug, Serialize)]
pub struct EntryView {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "crate::models::naive_datetime")]
    pub clock_in: PrimitiveDateTime,
    #[serde(with = "crate::models::naive_datetime::option")]
    pub clock_out: Option<PrimitiveDateTime>,
    pub note: String,
    pub duration_hours: f64,
    pub duration_display: String,
}

impl From<TimeEntry> for EntryView {
    fn from(e: TimeEntry) -> Self {
        let duration_hours = e.duration_hours();
        let duration_display = e.duration_display();
        Self {
            id: e.id,
            user_id: e.user_id,
            clock_in: e.clock_in,
            clock_out: e.clock_out,
            note: e.note,
            duration_hours,
            duration_display,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub active_entry: Option<EntryView>,
    pub weekly_hours: f64,
    pub pay_period_hours: f64,
    pub pay_accrued: f64,
    pub recent_entries: Vec<EntryView>,
}

/// Manual entry creation/edit payload.
#[derive(Debug, Deserialize)]
pub struct EntryRequest {
    #[serde(with = "crate::models::naive_datetime")]
    pub clock_in: PrimitiveDateTime,
    #[serde(default, with = "crate::models::naive_datetime::option")]
    pub clock_out: Option<PrimitiveDateTime>,
    #[serde(default)]
    pub note: String,
}

/// Partial settings update; absent fields keep their current value. Pay
/// period dates must be supplied together.
#[derive(Debug, Deserialize)]
pub struct SettingsRequest {
    pub pay_rate: Option<f64>,
    pub dark_mode: Option<bool>,
    #[serde(default, with = "crate::models::iso_date::option")]
    pub pay_period_start: Option<Date>,
    #[serde(default, with = "crate::models::iso_date::option")]
    pub pay_period_end: Option<Date>,
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;
    use time::OffsetDateTime;

    use super::*;

    #[test]
    fn entry_view_serializes_naive_timestamps() {
        let now = OffsetDateTime::now_utc();
        let view = EntryView::from(TimeEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            clock_in: datetime!(2024-01-01 09:00:00),
            clock_out: Some(datetime!(2024-01-01 17:00:00)),
            note: "shift".into(),
            created_at: now,
            updated_at: now,
        });
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["clock_in"], "2024-01-01T09:00:00");
        assert_eq!(json["clock_out"], "2024-01-01T17:00:00");
        assert_eq!(json["duration_display"], "8h 00m");
    }

    #[test]
    fn entry_request_accepts_missing_clock_out() {
        let req: EntryRequest =
            serde_json::from_str(r#"{"clock_in":"2024-01-01T09:00:00"}"#).unwrap();
        assert_eq!(req.clock_in, datetime!(2024-01-01 09:00:00));
        assert!(req.clock_out.is_none());
        assert!(req.note.is_empty());
    }

    #[test]
    fn entry_request_rejects_malformed_clock_in() {
        assert!(serde_json::from_str::<EntryRequest>(r#"{"clock_in":"bogus"}"#).is_err());
    }
}
