use serde::{Deserialize, Serialize};

use crate::auth::PublicUser;
use crate::timeclock::EntryView;

#[derive(Debug, Serialize)]
pub struct DashboardRow {
    pub user: PublicUser,
    pub weekly_hours: f64,
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub users: Vec<DashboardRow>,
    pub dept_week_hours: f64,
}

/// Optional `YYYY-MM-DD` bounds; unparseable values are ignored rather
/// than rejected.
#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserReportResponse {
    pub user: PublicUser,
    pub entries: Vec<EntryView>,
    pub total_hours: f64,
}

#[derive(Debug, Serialize)]
pub struct DeptReportRow {
    pub user: PublicUser,
    pub hours: f64,
    pub entry_count: usize,
}

#[derive(Debug, Serialize)]
pub struct DeptReportResponse {
    pub rows: Vec<DeptReportRow>,
    pub dept_total: f64,
}
