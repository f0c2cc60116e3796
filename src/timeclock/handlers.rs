use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    auth::{services::AuthUser, PublicUser},
    models::{clip_note, now_naive, TimeEntry, User},
    state::AppState,
    timeclock::{
        dto::{DashboardResponse, EntryRequest, EntryView, SettingsRequest},
        services,
    },
};

pub fn clock_routes() -> Router<AppState> {
    Router::new()
        .route("/timeclock/dashboard", get(dashboard))
        .route("/timeclock/clock-in", post(clock_in))
        .route("/timeclock/clock-out", post(clock_out))
}

pub fn entry_routes() -> Router<AppState> {
    Router::new()
        .route("/timeclock/entries", post(create_entry))
        .route(
            "/timeclock/entries/:id",
            put(update_entry).delete(delete_entry),
        )
        .route("/timeclock/settings", get(get_settings).put(update_settings))
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    error!(error = %e, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

async fn load_user(state: &AppState, user_id: Uuid) -> Result<User, (StatusCode, String)> {
    User::find_by_id(&state.db, user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".into()))
}

#[instrument(skip(state))]
pub async fn dashboard(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<DashboardResponse>, (StatusCode, String)> {
    let user = load_user(&state, user_id).await?;
    let now = now_naive();

    let active_entry = TimeEntry::active_for_user(&state.db, user_id)
        .await
        .map_err(internal)?
        .map(EntryView::from);
    let weekly_hours = services::weekly_hours(&state.db, user_id, now)
        .await
        .map_err(internal)?;
    let pay_period_hours = services::pay_period_hours(&state.db, &user)
        .await
        .map_err(internal)?;
    let recent_entries = TimeEntry::recent_for_user(&state.db, user_id, 30)
        .await
        .map_err(internal)?
        .into_iter()
        .map(EntryView::from)
        .collect();

    Ok(Json(DashboardResponse {
        active_entry,
        weekly_hours,
        pay_period_hours,
        pay_accrued: pay_period_hours * user.pay_rate,
        recent_entries,
    }))
}

#[instrument(skip(state))]
pub async fn clock_in(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<(StatusCode, Json<EntryView>), (StatusCode, String)> {
    let existing = TimeEntry::active_for_user(&state.db, user_id)
        .await
        .map_err(internal)?;
    if existing.is_some() {
        return Err((StatusCode::CONFLICT, "You are already clocked in.".into()));
    }

    let entry = TimeEntry::create(&state.db, user_id, now_naive(), None, "")
        .await
        .map_err(internal)?;
    info!(user_id = %user_id, entry_id = %entry.id, "clocked in");
    Ok((StatusCode::CREATED, Json(EntryView::from(entry))))
}

#[instrument(skip(state))]
pub async fn clock_out(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<EntryView>, (StatusCode, String)> {
    let entry = TimeEntry::active_for_user(&state.db, user_id)
        .await
        .map_err(internal)?
        .ok_or((
            StatusCode::CONFLICT,
            "You are not currently clocked in.".to_string(),
        ))?;

    let entry = TimeEntry::close(&state.db, entry.id, now_naive())
        .await
        .map_err(internal)?;
    info!(
        user_id = %user_id,
        entry_id = %entry.id,
        session = %entry.duration_display(),
        "clocked out"
    );
    Ok(Json(EntryView::from(entry)))
}

fn check_bounds(req: &EntryRequest) -> Result<(), (StatusCode, String)> {
    if let Some(out) = req.clock_out {
        if out <= req.clock_in {
            return Err((
                StatusCode::BAD_REQUEST,
                "Clock-out must be after clock-in.".into(),
            ));
        }
    }
    Ok(())
}

#[instrument(skip(state, req))]
pub async fn create_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<EntryRequest>,
) -> Result<(StatusCode, Json<EntryView>), (StatusCode, String)> {
    check_bounds(&req)?;
    let entry = TimeEntry::create(
        &state.db,
        user_id,
        req.clock_in,
        req.clock_out,
        &clip_note(&req.note),
    )
    .await
    .map_err(internal)?;
    info!(user_id = %user_id, entry_id = %entry.id, "entry added");
    Ok((StatusCode::CREATED, Json(EntryView::from(entry))))
}

#[instrument(skip(state, req))]
pub async fn update_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<EntryRequest>,
) -> Result<Json<EntryView>, (StatusCode, String)> {
    let entry = TimeEntry::find_for_user(&state.db, id, user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Entry not found.".to_string()))?;

    check_bounds(&req)?;
    let entry = TimeEntry::update(
        &state.db,
        entry.id,
        req.clock_in,
        req.clock_out,
        &clip_note(&req.note),
    )
    .await
    .map_err(internal)?;
    info!(user_id = %user_id, entry_id = %entry.id, "entry updated");
    Ok(Json(EntryView::from(entry)))
}

#[instrument(skip(state))]
pub async fn delete_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let entry = TimeEntry::find_for_user(&state.db, id, user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Entry not found.".to_string()))?;

    TimeEntry::delete(&state.db, entry.id)
        .await
        .map_err(internal)?;
    info!(user_id = %user_id, entry_id = %entry.id, "entry deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn get_settings(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = load_user(&state, user_id).await?;
    Ok(Json(PublicUser::from(user)))
}

#[instrument(skip(state, req))]
pub async fn update_settings(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<SettingsRequest>,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = load_user(&state, user_id).await?;

    let pay_rate = req.pay_rate.map_or(user.pay_rate, |r| r.max(0.0));
    let dark_mode = req.dark_mode.unwrap_or(user.dark_mode);
    let (pay_period_start, pay_period_end) = match (req.pay_period_start, req.pay_period_end) {
        (Some(start), Some(end)) => {
            if end < start {
                return Err((
                    StatusCode::BAD_REQUEST,
                    "End date must be after start date.".into(),
                ));
            }
            (Some(start), Some(end))
        }
        (None, None) => (user.pay_period_start, user.pay_period_end),
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                "Please enter both start and end dates.".into(),
            ));
        }
    };

    let user = User::update_settings(
        &state.db,
        user_id,
        pay_rate,
        dark_mode,
        pay_period_start,
        pay_period_end,
    )
    .await
    .map_err(internal)?;
    info!(user_id = %user.id, "settings updated");
    Ok(Json(PublicUser::from(user)))
}
