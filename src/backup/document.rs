//! Wire format of backup documents, split into two deliberately separate
//! projections: what export writes ([`ExportedUser`], [`ExportedEntry`]) and
//! what import is willing to read and apply ([`IncomingUser`] via
//! [`UserPatch`], [`IncomingEntry`]). The admin flag exists only on the
//! export side and in the raw incoming record; [`UserPatch`] has no such
//! field, so a restore cannot grant it.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

use crate::models::{TimeEntry, User, DATE_FORMAT, NAIVE_DATETIME_FORMAT};

use super::error::RestoreError;

/// Format marker; import refuses documents that do not carry it.
pub const APP_TAG: &str = "time-trackinator";

/// Uploads larger than this are rejected before any parsing happens.
pub const MAX_BACKUP_BYTES: usize = 10 * 1024 * 1024;

/// Full snapshot written by export.
#[derive(Debug, Serialize)]
pub struct BackupDocument {
    #[serde(with = "time::serde::rfc3339")]
    pub exported_at: OffsetDateTime,
    pub app: String,
    pub users: Vec<ExportedUser>,
    pub time_entries: Vec<ExportedEntry>,
}

/// Export-side projection of a user. Carries the admin flag for operator
/// visibility; the import side never applies it.
#[derive(Debug, Serialize)]
pub struct ExportedUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub provider: String,
    pub is_admin: bool,
    pub pay_rate: f64,
    pub dark_mode: bool,
    #[serde(with = "crate::models::iso_date::option")]
    pub pay_period_start: Option<Date>,
    #[serde(with = "crate::models::iso_date::option")]
    pub pay_period_end: Option<Date>,
}

impl From<&User> for ExportedUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            name: u.name.clone(),
            provider: u.provider.clone(),
            is_admin: u.is_admin,
            pay_rate: u.pay_rate,
            dark_mode: u.dark_mode,
            pay_period_start: u.pay_period_start,
            pay_period_end: u.pay_period_end,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExportedEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "crate::models::naive_datetime")]
    pub clock_in: PrimitiveDateTime,
    #[serde(with = "crate::models::naive_datetime::option")]
    pub clock_out: Option<PrimitiveDateTime>,
    pub note: String,
}

impl From<&TimeEntry> for ExportedEntry {
    fn from(e: &TimeEntry) -> Self {
        Self {
            id: e.id,
            user_id: e.user_id,
            clock_in: e.clock_in,
            clock_out: e.clock_out,
            note: e.note.clone(),
        }
    }
}

/// Import-side view of an uploaded document. `exported_at` is informational
/// and not read back.
#[derive(Debug, Deserialize)]
pub struct IncomingDocument {
    #[serde(default)]
    pub users: Vec<IncomingUser>,
    #[serde(default)]
    pub time_entries: Vec<IncomingEntry>,
}

/// Raw incoming user record. `id` stays an opaque JSON value: it is only a
/// correlation key within the document, never written to the store.
#[derive(Debug, Deserialize)]
pub struct IncomingUser {
    pub id: serde_json::Value,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub pay_rate: f64,
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default)]
    pub pay_period_start: Option<String>,
    #[serde(default)]
    pub pay_period_end: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingEntry {
    pub user_id: serde_json::Value,
    #[serde(default)]
    pub clock_in: Option<String>,
    #[serde(default)]
    pub clock_out: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl IncomingEntry {
    /// Classify the entry's timestamps. `Ok(None)` means "skip this entry"
    /// (no clock-in recorded); a present but malformed value is a hard
    /// error that aborts the whole restore.
    pub fn parsed_times(
        &self,
    ) -> Result<Option<(PrimitiveDateTime, Option<PrimitiveDateTime>)>, RestoreError> {
        let Some(raw_in) = self.clock_in.as_deref().filter(|s| !s.trim().is_empty()) else {
            return Ok(None);
        };
        let clock_in = parse_naive(raw_in, "clock_in")?;
        let clock_out = match self.clock_out.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) => Some(parse_naive(raw, "clock_out")?),
            None => None,
        };
        Ok(Some((clock_in, clock_out)))
    }
}

/// The fields of an incoming user the merge is allowed to apply. This
/// projection intentionally has no admin flag.
#[derive(Debug, Clone, PartialEq)]
pub struct UserPatch {
    pub email: String,
    pub name: String,
    pub provider: String,
    pub pay_rate: f64,
    pub dark_mode: bool,
    pub pay_period_start: Option<Date>,
    pub pay_period_end: Option<Date>,
}

impl UserPatch {
    pub fn from_incoming(u: &IncomingUser) -> Result<UserPatch, RestoreError> {
        let email = u.email.trim().to_lowercase();
        if email.is_empty() {
            return Err(RestoreError::InvalidField {
                field: "email",
                value: u.email.clone(),
            });
        }
        Ok(UserPatch {
            email,
            name: u.name.trim().to_string(),
            provider: u.provider.clone(),
            pay_rate: u.pay_rate.max(0.0),
            dark_mode: u.dark_mode,
            pay_period_start: parse_opt_date(u.pay_period_start.as_deref(), "pay_period_start")?,
            pay_period_end: parse_opt_date(u.pay_period_end.as_deref(), "pay_period_end")?,
        })
    }
}

/// Stable key for document-scoped ids. Treats the id as opaque: numeric and
/// string ids both work, and `1` and `"1"` stay distinct.
pub fn correlation_key(id: &serde_json::Value) -> String {
    id.to_string()
}

fn parse_naive(raw: &str, field: &'static str) -> Result<PrimitiveDateTime, RestoreError> {
    PrimitiveDateTime::parse(raw, NAIVE_DATETIME_FORMAT).map_err(|_| RestoreError::InvalidField {
        field,
        value: raw.to_string(),
    })
}

fn parse_opt_date(raw: Option<&str>, field: &'static str) -> Result<Option<Date>, RestoreError> {
    match raw.filter(|s| !s.trim().is_empty()) {
        Some(s) => Date::parse(s, DATE_FORMAT)
            .map(Some)
            .map_err(|_| RestoreError::InvalidField {
                field,
                value: s.to_string(),
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::*;

    fn incoming_user() -> IncomingUser {
        IncomingUser {
            id: serde_json::json!(1),
            email: "A@X.com".into(),
            name: " Alice ".into(),
            provider: "google".into(),
            is_admin: false,
            pay_rate: 20.0,
            dark_mode: true,
            pay_period_start: Some("2024-01-01".into()),
            pay_period_end: Some("2024-01-15".into()),
        }
    }

    #[test]
    fn patch_normalizes_email_and_dates() {
        let patch = UserPatch::from_incoming(&incoming_user()).unwrap();
        assert_eq!(patch.email, "a@x.com");
        assert_eq!(patch.name, "Alice");
        assert_eq!(patch.pay_period_start, Some(date!(2024 - 01 - 01)));
        assert_eq!(patch.pay_period_end, Some(date!(2024 - 01 - 15)));
    }

    #[test]
    fn patch_is_identical_with_or_without_admin_flag() {
        let granted = IncomingUser {
            is_admin: true,
            ..incoming_user()
        };
        assert_eq!(
            UserPatch::from_incoming(&granted).unwrap(),
            UserPatch::from_incoming(&incoming_user()).unwrap()
        );
    }

    #[test]
    fn patch_clamps_negative_pay_rate() {
        let u = IncomingUser {
            pay_rate: -3.5,
            ..incoming_user()
        };
        assert_eq!(UserPatch::from_incoming(&u).unwrap().pay_rate, 0.0);
    }

    #[test]
    fn patch_rejects_empty_email() {
        let u = IncomingUser {
            email: "   ".into(),
            ..incoming_user()
        };
        assert!(matches!(
            UserPatch::from_incoming(&u),
            Err(RestoreError::InvalidField { field: "email", .. })
        ));
    }

    #[test]
    fn patch_rejects_malformed_date() {
        let u = IncomingUser {
            pay_period_start: Some("January 1st".into()),
            ..incoming_user()
        };
        assert!(matches!(
            UserPatch::from_incoming(&u),
            Err(RestoreError::InvalidField {
                field: "pay_period_start",
                ..
            })
        ));
    }

    #[test]
    fn missing_clock_in_means_skip() {
        let e = IncomingEntry {
            user_id: serde_json::json!(1),
            clock_in: None,
            clock_out: None,
            note: None,
        };
        assert!(e.parsed_times().unwrap().is_none());

        let e = IncomingEntry {
            clock_in: Some("  ".into()),
            ..e
        };
        assert!(e.parsed_times().unwrap().is_none());
    }

    #[test]
    fn malformed_clock_in_is_a_hard_error() {
        let e = IncomingEntry {
            user_id: serde_json::json!(1),
            clock_in: Some("yesterday".into()),
            clock_out: None,
            note: None,
        };
        assert!(matches!(
            e.parsed_times(),
            Err(RestoreError::InvalidField { field: "clock_in", .. })
        ));
    }

    #[test]
    fn well_formed_times_parse() {
        let e = IncomingEntry {
            user_id: serde_json::json!(1),
            clock_in: Some("2024-01-01T09:00:00".into()),
            clock_out: Some("2024-01-01T17:00:00".into()),
            note: None,
        };
        let (ci, co) = e.parsed_times().unwrap().unwrap();
        assert_eq!(ci, datetime!(2024-01-01 09:00:00));
        assert_eq!(co, Some(datetime!(2024-01-01 17:00:00)));
    }

    #[test]
    fn correlation_keys_stay_distinct_by_type() {
        assert_ne!(
            correlation_key(&serde_json::json!(1)),
            correlation_key(&serde_json::json!("1"))
        );
        assert_eq!(
            correlation_key(&serde_json::json!(7)),
            correlation_key(&serde_json::json!(7))
        );
    }
}
