//! Backup and restore of the full record store as a JSON document. The
//! export and import halves share the wire format in [`document`] but use
//! separate projections; see that module for why.

pub mod document;
pub mod error;
pub mod export;
pub mod restore;

pub use document::{BackupDocument, APP_TAG, MAX_BACKUP_BYTES};
pub use error::RestoreError;
pub use export::export_store;
pub use restore::{restore_document, RestoreSummary};

use crate::models::User;

/// The authenticated admin a backup operation runs on behalf of. Passed in
/// explicitly so the engine stays testable without ambient request state.
#[derive(Debug, Clone)]
pub struct AdminCtx {
    pub user_id: uuid::Uuid,
    pub email: String,
}

impl AdminCtx {
    pub fn new(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
        }
    }
}
