use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use bytes::Bytes;
use time::{Date, OffsetDateTime, PrimitiveDateTime};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    admin::dto::{
        DashboardResponse, DashboardRow, DeptReportResponse, DeptReportRow, ReportQuery,
        UserReportResponse,
    },
    auth::{services::AdminUser, PublicUser},
    backup::{self, AdminCtx, RestoreSummary, MAX_BACKUP_BYTES},
    models::{clip_note, now_naive, TimeEntry, User},
    state::AppState,
    timeclock::{
        dto::{EntryRequest, EntryView},
        services,
    },
};

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/dashboard", get(dashboard))
        .route("/admin/report", get(dept_report))
        .route("/admin/users/:id/report", get(user_report))
}

pub fn entry_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users/:id/entries", post(create_entry))
        .route("/admin/entries/:id", put(update_entry).delete(delete_entry))
}

pub fn backup_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/backup", get(download_backup))
        .route("/admin/restore", post(restore_backup))
        // A touch above the engine's own cap so multipart framing does not
        // eat into it; the engine check is the authoritative one.
        .layer(DefaultBodyLimit::max(MAX_BACKUP_BYTES + 64 * 1024))
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    error!(error = %e, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// Unparseable range values are dropped, matching the lenient report
/// filters the UI has always had.
fn parse_range(
    q: &ReportQuery,
) -> (Option<PrimitiveDateTime>, Option<PrimitiveDateTime>) {
    let start = q
        .start
        .as_deref()
        .and_then(|s| Date::parse(s, crate::models::DATE_FORMAT).ok())
        .map(services::start_of_day);
    let end = q
        .end
        .as_deref()
        .and_then(|s| Date::parse(s, crate::models::DATE_FORMAT).ok())
        .map(services::end_of_day);
    (start, end)
}

#[instrument(skip(state, _admin))]
pub async fn dashboard(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<DashboardResponse>, (StatusCode, String)> {
    let now = now_naive();
    let mut rows = Vec::new();
    let mut dept_week_hours = 0.0;

    for user in User::list_by_name(&state.db).await.map_err(internal)? {
        let weekly_hours = services::weekly_hours(&state.db, user.id, now)
            .await
            .map_err(internal)?;
        dept_week_hours += weekly_hours;
        let is_active = TimeEntry::active_for_user(&state.db, user.id)
            .await
            .map_err(internal)?
            .is_some();
        rows.push(DashboardRow {
            user: PublicUser::from(user),
            weekly_hours,
            is_active,
        });
    }

    Ok(Json(DashboardResponse {
        users: rows,
        dept_week_hours,
    }))
}

#[instrument(skip(state, _admin))]
pub async fn user_report(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<UserReportResponse>, (StatusCode, String)> {
    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "User not found.".to_string()))?;

    let (start, end) = parse_range(&query);
    let entries = TimeEntry::list_for_user(&state.db, user_id, start, end)
        .await
        .map_err(internal)?;
    let total_hours = entries
        .iter()
        .filter(|e| e.clock_out.is_some())
        .map(TimeEntry::duration_hours)
        .sum();

    Ok(Json(UserReportResponse {
        user: PublicUser::from(user),
        entries: entries.into_iter().map(EntryView::from).collect(),
        total_hours,
    }))
}

#[instrument(skip(state, _admin))]
pub async fn dept_report(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<ReportQuery>,
) -> Result<Json<DeptReportResponse>, (StatusCode, String)> {
    let (start, end) = parse_range(&query);
    let mut rows = Vec::new();
    let mut dept_total = 0.0;

    for user in User::list_by_name(&state.db).await.map_err(internal)? {
        let entries = TimeEntry::list_for_user(&state.db, user.id, start, end)
            .await
            .map_err(internal)?;
        let finished: Vec<&TimeEntry> =
            entries.iter().filter(|e| e.clock_out.is_some()).collect();
        let hours: f64 = finished.iter().map(|e| e.duration_hours()).sum();
        dept_total += hours;
        rows.push(DeptReportRow {
            user: PublicUser::from(user),
            hours,
            entry_count: finished.len(),
        });
    }

    Ok(Json(DeptReportResponse { rows, dept_total }))
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

#[instrument(skip(state, admin, req))]
pub async fn create_entry(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<Uuid>,
    Json(req): Json<EntryRequest>,
) -> Result<(StatusCode, Json<EntryView>), (StatusCode, String)> {
    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "User not found.".to_string()))?;

    check_bounds(&req)?;
    let entry = TimeEntry::create(
        &state.db,
        user.id,
        req.clock_in,
        req.clock_out,
        &clip_note(&req.note),
    )
    .await
    .map_err(internal)?;
    info!(admin = %admin.email, user_id = %user.id, entry_id = %entry.id, "entry added");
    Ok((StatusCode::CREATED, Json(EntryView::from(entry))))
}

#[instrument(skip(state, admin, req))]
pub async fn update_entry(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(entry_id): Path<Uuid>,
    Json(req): Json<EntryRequest>,
) -> Result<Json<EntryView>, (StatusCode, String)> {
    let entry = TimeEntry::find_by_id(&state.db, entry_id)
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
    info!(admin = %admin.email, entry_id = %entry.id, "entry updated");
    Ok(Json(EntryView::from(entry)))
}

#[instrument(skip(state, admin))]
pub async fn delete_entry(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(entry_id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let entry = TimeEntry::find_by_id(&state.db, entry_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Entry not found.".to_string()))?;

    TimeEntry::delete(&state.db, entry.id)
        .await
        .map_err(internal)?;
    info!(admin = %admin.email, entry_id = %entry.id, "entry deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, admin))]
pub async fn download_backup(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let ctx = AdminCtx::new(&admin);
    let doc = backup::export_store(&state.db, &ctx)
        .await
        .map_err(internal)?;
    let body = serde_json::to_string_pretty(&doc).map_err(internal)?;

    let filename = format!("timeclock-backup-{}.json", OffsetDateTime::now_utc().date());
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={filename}"),
            ),
        ],
        body,
    ))
}

#[instrument(skip(state, admin, multipart))]
pub async fn restore_backup(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    mut multipart: Multipart,
) -> Result<Json<RestoreSummary>, (StatusCode, String)> {
    let mut payload: Option<Bytes> = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("backup_file") {
            let bytes = field.bytes().await.map_err(|e| {
                warn!(error = %e, "reading uploaded backup failed");
                (
                    StatusCode::BAD_REQUEST,
                    "Could not read the uploaded file.".to_string(),
                )
            })?;
            payload = Some(bytes);
            break;
        }
    }
    let payload = payload.ok_or((StatusCode::BAD_REQUEST, "No file uploaded.".to_string()))?;

    let ctx = AdminCtx::new(&admin);
    let summary = backup::restore_document(&state.db, &ctx, &payload)
        .await
        .map_err(|e| (e.status(), e.user_message().to_string()))?;
    Ok(Json(summary))
}
