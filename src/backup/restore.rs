use std::collections::{HashMap, HashSet};

use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use time::PrimitiveDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::clip_note;

use super::document::{
    correlation_key, IncomingDocument, UserPatch, APP_TAG, MAX_BACKUP_BYTES,
};
use super::error::RestoreError;
use super::AdminCtx;

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct RestoreSummary {
    pub users_merged: usize,
    pub entries_added: usize,
    pub entries_skipped: usize,
}

/// Validate raw upload bytes into a typed document. Order matters: the size
/// gate runs before any parsing, and the app tag is checked before the
/// document shape.
pub fn parse_document(bytes: &[u8]) -> Result<IncomingDocument, RestoreError> {
    if bytes.len() > MAX_BACKUP_BYTES {
        return Err(RestoreError::TooLarge { size: bytes.len() });
    }

    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(RestoreError::MalformedJson)?;

    match value.get("app").and_then(|v| v.as_str()) {
        Some(tag) if tag == APP_TAG => {}
        _ => return Err(RestoreError::UnrecognizedFormat),
    }

    serde_json::from_value(value).map_err(RestoreError::MalformedDocument)
}

/// Merge an uploaded backup into the live store. Users upsert by email,
/// entries dedup on (user, clock-in), and everything runs in a single
/// transaction: any error rolls the whole restore back. Re-importing the
/// same document is a no-op.
pub async fn restore_document(
    db: &PgPool,
    admin: &AdminCtx,
    bytes: &[u8],
) -> Result<RestoreSummary, RestoreError> {
    match run(db, bytes).await {
        Ok(summary) => {
            info!(
                admin = %admin.email,
                users_merged = summary.users_merged,
                entries_added = summary.entries_added,
                entries_skipped = summary.entries_skipped,
                "backup restored"
            );
            Ok(summary)
        }
        Err(err) => {
            warn!(admin = %admin.email, error = %err, "restore failed");
            Err(err)
        }
    }
}

async fn run(db: &PgPool, bytes: &[u8]) -> Result<RestoreSummary, RestoreError> {
    let doc = parse_document(bytes)?;

    let mut tx = db.begin().await?;
    let mut summary = RestoreSummary::default();

    // Users first: upsert by email, remembering how document ids map onto
    // live rows. Ids in the document are not assumed stable.
    let mut id_map: HashMap<String, Uuid> = HashMap::new();
    for user in &doc.users {
        let patch = UserPatch::from_incoming(user)?;
        if user.is_admin {
            // Visible in the export for operators, never applied here.
            debug!(email = %patch.email, "admin flag in document ignored");
        }
        let live_id = upsert_user(&mut tx, &patch).await?;
        id_map.insert(correlation_key(&user.id), live_id);
        summary.users_merged += 1;
    }

    // Entries second, resolving owners through the map built above.
    let mut seen: HashSet<(Uuid, PrimitiveDateTime)> = HashSet::new();
    for entry in &doc.time_entries {
        let Some(&owner) = id_map.get(&correlation_key(&entry.user_id)) else {
            // Orphaned reference: owner never appeared in the users list.
            summary.entries_skipped += 1;
            continue;
        };
        let Some((clock_in, clock_out)) = entry.parsed_times()? else {
            // No clock-in recorded.
            summary.entries_skipped += 1;
            continue;
        };
        if !seen.insert((owner, clock_in)) {
            summary.entries_skipped += 1;
            continue;
        }
        let existing: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM time_entries WHERE user_id = $1 AND clock_in = $2")
                .bind(owner)
                .bind(clock_in)
                .fetch_optional(&mut *tx)
                .await?;
        if existing.is_some() {
            summary.entries_skipped += 1;
            continue;
        }

        sqlx::query(
            r#"
            INSERT INTO time_entries (user_id, clock_in, clock_out, note)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(owner)
        .bind(clock_in)
        .bind(clock_out)
        .bind(clip_note(entry.note.as_deref().unwrap_or_default()))
        .execute(&mut *tx)
        .await?;
        summary.entries_added += 1;
    }

    tx.commit().await?;
    Ok(summary)
}

async fn upsert_user(
    tx: &mut Transaction<'_, Postgres>,
    patch: &UserPatch,
) -> Result<Uuid, RestoreError> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&patch.email)
        .fetch_optional(&mut **tx)
        .await?;

    let id = match existing {
        Some((id,)) => {
            // is_admin is deliberately absent from this update.
            sqlx::query(
                r#"
                UPDATE users
                SET name = $2, provider = $3, pay_rate = $4, dark_mode = $5,
                    pay_period_start = COALESCE($6, pay_period_start),
                    pay_period_end = COALESCE($7, pay_period_end)
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(&patch.name)
            .bind(&patch.provider)
            .bind(patch.pay_rate)
            .bind(patch.dark_mode)
            .bind(patch.pay_period_start)
            .bind(patch.pay_period_end)
            .execute(&mut **tx)
            .await?;
            id
        }
        None => {
            let (id,): (Uuid,) = sqlx::query_as(
                r#"
                INSERT INTO users
                    (email, name, provider, pay_rate, dark_mode,
                     pay_period_start, pay_period_end)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING id
                "#,
            )
            .bind(&patch.email)
            .bind(&patch.name)
            .bind(&patch.provider)
            .bind(patch.pay_rate)
            .bind(patch.dark_mode)
            .bind(patch.pay_period_start)
            .bind(patch.pay_period_end)
            .fetch_one(&mut **tx)
            .await?;
            id
        }
    };
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(body: &str) -> Vec<u8> {
        format!(r#"{{"app":"{APP_TAG}",{body}}}"#).into_bytes()
    }

    #[test]
    fn oversized_payload_is_rejected_before_parsing() {
        // Not even JSON; the size gate must fire first.
        let bytes = vec![b'x'; MAX_BACKUP_BYTES + 1];
        assert!(matches!(
            parse_document(&bytes),
            Err(RestoreError::TooLarge { .. })
        ));
    }

    #[test]
    fn corrupt_json_is_rejected() {
        assert!(matches!(
            parse_document(b"{not json"),
            Err(RestoreError::MalformedJson(_))
        ));
    }

    #[test]
    fn missing_app_tag_is_unrecognized() {
        assert!(matches!(
            parse_document(br#"{"users":[],"time_entries":[]}"#),
            Err(RestoreError::UnrecognizedFormat)
        ));
    }

    #[test]
    fn wrong_app_tag_is_unrecognized() {
        assert!(matches!(
            parse_document(br#"{"app":"some-other-app","users":[]}"#),
            Err(RestoreError::UnrecognizedFormat)
        ));
    }

    #[test]
    fn non_string_app_tag_is_unrecognized() {
        assert!(matches!(
            parse_document(br#"{"app":42}"#),
            Err(RestoreError::UnrecognizedFormat)
        ));
    }

    #[test]
    fn wrong_shape_is_malformed() {
        let bytes = tagged(r#""users":"not a list""#);
        assert!(matches!(
            parse_document(&bytes),
            Err(RestoreError::MalformedDocument(_))
        ));
    }

    #[test]
    fn user_without_email_is_malformed() {
        let bytes = tagged(r#""users":[{"id":1}]"#);
        assert!(matches!(
            parse_document(&bytes),
            Err(RestoreError::MalformedDocument(_))
        ));
    }

    #[test]
    fn tag_alone_parses_to_empty_document() {
        let doc = parse_document(br#"{"app":"time-trackinator"}"#).unwrap();
        assert!(doc.users.is_empty());
        assert!(doc.time_entries.is_empty());
    }

    #[test]
    fn integer_and_string_ids_both_correlate() {
        let bytes = tagged(
            r#""users":[{"id":1,"email":"a@x.com"},{"id":"u-2","email":"b@x.com"}],
               "time_entries":[{"user_id":1,"clock_in":"2024-01-01T09:00:00"},
                               {"user_id":"u-2","clock_in":"2024-01-02T09:00:00"},
                               {"user_id":99,"clock_in":"2024-01-03T09:00:00"}]"#,
        );
        let doc = parse_document(&bytes).unwrap();
        let keys: Vec<String> = doc.users.iter().map(|u| correlation_key(&u.id)).collect();
        assert!(keys.contains(&correlation_key(&doc.time_entries[0].user_id)));
        assert!(keys.contains(&correlation_key(&doc.time_entries[1].user_id)));
        // The orphan resolves to nothing.
        assert!(!keys.contains(&correlation_key(&doc.time_entries[2].user_id)));
    }

    #[test]
    fn admin_flag_is_parsed_but_kept_out_of_the_patch() {
        let bytes = tagged(r#""users":[{"id":1,"email":"a@x.com","is_admin":true}]"#);
        let doc = parse_document(&bytes).unwrap();
        assert!(doc.users[0].is_admin);
        // The applied projection carries everything except that flag.
        let patch = UserPatch::from_incoming(&doc.users[0]).unwrap();
        assert_eq!(patch.email, "a@x.com");
    }

    #[test]
    fn legacy_integer_id_document_parses() {
        let bytes = tagged(
            r#""users":[{"id":1,"email":"a@x.com","is_admin":true}],
               "time_entries":[{"user_id":1,"clock_in":"2024-01-01T09:00:00",
                                "clock_out":"2024-01-01T17:00:00"}]"#,
        );
        let doc = parse_document(&bytes).unwrap();
        let (clock_in, clock_out) = doc.time_entries[0].parsed_times().unwrap().unwrap();
        let worked = (clock_out.unwrap() - clock_in).as_seconds_f64() / 3600.0;
        assert!((worked - 8.0).abs() < 1e-9);
    }
}
