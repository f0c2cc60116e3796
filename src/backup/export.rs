use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::info;

use crate::models::{TimeEntry, User};

use super::document::{BackupDocument, ExportedEntry, ExportedUser, APP_TAG};
use super::AdminCtx;

/// Snapshot every user and time entry into a portable document. Read-only;
/// the audit line names the admin who asked for it.
pub async fn export_store(db: &PgPool, admin: &AdminCtx) -> anyhow::Result<BackupDocument> {
    let users = User::list_all(db).await?;
    let entries = TimeEntry::list_all(db).await?;

    let doc = BackupDocument {
        exported_at: OffsetDateTime::now_utc(),
        app: APP_TAG.to_string(),
        users: users.iter().map(ExportedUser::from).collect(),
        time_entries: entries.iter().map(ExportedEntry::from).collect(),
    };

    info!(
        admin = %admin.email,
        users = doc.users.len(),
        entries = doc.time_entries.len(),
        "backup exported"
    );
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;
    use uuid::Uuid;

    use super::*;
    use crate::backup::restore::parse_document;

    fn sample_document() -> BackupDocument {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            name: "Alice".into(),
            provider: "microsoft".into(),
            is_admin: true,
            last_login: None,
            pay_rate: 25.0,
            dark_mode: false,
            pay_period_start: None,
            pay_period_end: None,
            created_at: OffsetDateTime::now_utc(),
        };
        let entry = TimeEntry {
            id: Uuid::new_v4(),
            user_id: user.id,
            clock_in: datetime!(2024-01-01 09:00:00),
            clock_out: None,
            note: "open shift".into(),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        };
        BackupDocument {
            exported_at: OffsetDateTime::now_utc(),
            app: APP_TAG.to_string(),
            users: vec![ExportedUser::from(&user)],
            time_entries: vec![ExportedEntry::from(&entry)],
        }
    }

    #[test]
    fn document_serializes_nulls_explicitly() {
        let json = serde_json::to_value(sample_document()).unwrap();
        assert_eq!(json["app"], APP_TAG);
        let user = &json["users"][0];
        assert_eq!(user["is_admin"], true);
        assert!(user["pay_period_start"].is_null());
        assert!(user["pay_period_end"].is_null());
        let entry = &json["time_entries"][0];
        assert_eq!(entry["clock_in"], "2024-01-01T09:00:00");
        assert!(entry["clock_out"].is_null());
    }

    #[test]
    fn exported_document_is_accepted_by_import() {
        let bytes = serde_json::to_vec(&sample_document()).unwrap();
        let doc = parse_document(&bytes).expect("own exports must re-import");
        assert_eq!(doc.users.len(), 1);
        assert_eq!(doc.time_entries.len(), 1);
        // Projection check: the entry's times classify as insertable.
        assert!(doc.time_entries[0].parsed_times().unwrap().is_some());
    }
}
