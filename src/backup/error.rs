use axum::http::StatusCode;
use thiserror::Error;

/// Everything that can go wrong while restoring a backup. Raw parser and
/// database detail stays in the logs; callers show [`user_message`] only.
///
/// [`user_message`]: RestoreError::user_message
#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("backup exceeds the size limit ({size} bytes)")]
    TooLarge { size: usize },

    #[error("backup is not valid JSON")]
    MalformedJson(#[source] serde_json::Error),

    #[error("missing or mismatched app tag")]
    UnrecognizedFormat,

    #[error("backup document has an unexpected shape")]
    MalformedDocument(#[source] serde_json::Error),

    #[error("invalid {field} value: {value:?}")]
    InvalidField {
        field: &'static str,
        value: String,
    },

    #[error("database error during restore")]
    Store(#[from] sqlx::Error),
}

impl RestoreError {
    pub fn status(&self) -> StatusCode {
        match self {
            RestoreError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RestoreError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to surface to the requesting admin.
    pub fn user_message(&self) -> &'static str {
        match self {
            RestoreError::TooLarge { .. } => "Backup file is too large.",
            RestoreError::UnrecognizedFormat => {
                "This does not appear to be a valid Time Trackinator backup."
            }
            RestoreError::InvalidField { .. } => {
                "Restore failed: the backup contains an invalid date or timestamp."
            }
            RestoreError::MalformedJson(_)
            | RestoreError::MalformedDocument(_)
            | RestoreError::Store(_) => "Restore failed: corrupt or invalid file.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_never_leak_parser_detail() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let detail = parse_err.to_string();
        let err = RestoreError::MalformedJson(parse_err);
        assert!(!err.user_message().contains(&detail));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn oversize_maps_to_payload_too_large() {
        let err = RestoreError::TooLarge { size: 11_000_000 };
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.user_message(), "Backup file is too large.");
    }
}
