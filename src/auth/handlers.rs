use axum::{
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, CallbackQuery, PublicUser, RefreshRequest},
        oauth::{self, OauthError, Provider},
        services::{is_valid_email, AuthUser, JwtKeys},
    },
    models::User,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login/:provider", get(login))
        .route("/auth/callback/:provider", get(callback))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn parse_provider(raw: &str) -> Result<Provider, (StatusCode, String)> {
    Provider::parse(raw).ok_or((StatusCode::NOT_FOUND, "Unknown provider".into()))
}

#[instrument(skip(state))]
pub async fn login(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> Result<Redirect, (StatusCode, String)> {
    let provider = parse_provider(&provider)?;
    let keys = JwtKeys::from_ref(&state);
    let state_token = keys.sign_state().map_err(|e| {
        error!(error = %e, "sign oauth state failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    let url = oauth::authorize_url(provider, &state.config.oauth, &state_token).map_err(|e| {
        match e {
            OauthError::NotConfigured => (
                StatusCode::NOT_FOUND,
                "This sign-in provider is not configured".into(),
            ),
            other => {
                error!(error = %other, "authorize url failed");
                (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
            }
        }
    })?;

    Ok(Redirect::temporary(&url))
}

#[instrument(skip(state, query))]
pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let provider = parse_provider(&provider)?;
    let keys = JwtKeys::from_ref(&state);

    if keys.verify_state(&query.state).is_err() {
        warn!(provider = provider.as_str(), "oauth state rejected");
        return Err((
            StatusCode::BAD_REQUEST,
            "Invalid or expired sign-in state. Please try again.".into(),
        ));
    }

    let identity = oauth::fetch_identity(provider, &state.config.oauth, &query.code)
        .await
        .map_err(|e| {
            warn!(error = %e, provider = provider.as_str(), "oauth callback failed");
            (
                StatusCode::UNAUTHORIZED,
                "Sign-in failed. Please try again.".into(),
            )
        })?;

    let email = identity.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(provider = provider.as_str(), "provider returned unusable email");
        return Err((
            StatusCode::UNAUTHORIZED,
            "Could not retrieve your email address.".into(),
        ));
    }

    if !state.config.is_domain_allowed(&email) {
        warn!(%email, provider = provider.as_str(), "domain rejected");
        return Err((
            StatusCode::FORBIDDEN,
            "Your email domain is not authorized to access this application.".into(),
        ));
    }

    let is_admin = state.config.is_admin_email(&email);
    let user = User::upsert_login(
        &state.db,
        &email,
        identity.name.trim(),
        provider.as_str(),
        is_admin,
    )
    .await
    .map_err(|e| {
        error!(error = %e, %email, "login upsert failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    let access_token = keys
        .sign_access(user.id)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let refresh_token = keys
        .sign_refresh(user.id)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    info!(user_id = %user.id, email = %user.email, provider = provider.as_str(), "user logged in");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::from(user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (StatusCode::UNAUTHORIZED, format!("{}", e)))?;

    // Issue new pair
    let access_token = keys
        .sign_access(claims.sub)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let refresh_token = keys
        .sign_refresh(claims.sub)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::from(user),
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user_id, "load user failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    Ok(Json(PublicUser::from(user)))
}

#[cfg(test)]
mod me_tests {
    use super::*;

    #[test]
    fn public_user_serializes_settings() {
        let user = PublicUser {
            id: uuid::Uuid::new_v4(),
            email: "test@example.com".to_string(),
            name: "Test".to_string(),
            provider: "google".to_string(),
            is_admin: false,
            pay_rate: 21.5,
            dark_mode: true,
            pay_period_start: Some(time::macros::date!(2024 - 01 - 01)),
            pay_period_end: None,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["email"], "test@example.com");
        assert_eq!(json["pay_period_start"], "2024-01-01");
        assert!(json["pay_period_end"].is_null());
    }
}
