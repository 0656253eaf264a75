use axum::{
    extract::{Path, State},
    Json,
};
use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, FromQueryResult, Statement};
use serde::Serialize;
use utoipa::ToSchema;

use crate::common::AppState;
use crate::error::{AppError, AppResult};

const USAGE_WINDOW_DAYS: u32 = 30;

/// Gas used on one calendar day, in the units the scale reports.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyUsage {
    pub date: NaiveDate,
    pub usage: f64,
}

#[derive(Debug, FromQueryResult)]
struct UsageRow {
    day: NaiveDate,
    used: Option<f64>,
}

/// Daily gas usage of a machine over the last 30 days with readings
///
/// Usage for a day is the spread between its heaviest and lightest reading.
#[utoipa::path(
    get,
    path = "/api/machines/{machine_id}/usage",
    params(
        ("machine_id" = String, Path, description = "Machine key as reported by the device"),
    ),
    responses(
        (status = 200, description = "Usage retrieved successfully, oldest day first", body = Vec<DailyUsage>),
        (status = 400, description = "Missing machine_id"),
    ),
    tag = "machines"
)]
pub async fn machine_usage(
    State(state): State<AppState>,
    Path(machine_id): Path<String>,
) -> AppResult<Json<Vec<DailyUsage>>> {
    let machine_id = machine_id.trim();
    if machine_id.is_empty() {
        return Err(AppError::BadRequest("Invalid or missing machine_id".to_string()));
    }

    let sql = format!(
        "SELECT DATE(recorded_at) AS day, MAX(current_weight) - MIN(current_weight) AS used \
         FROM sensor_data WHERE machine_id = ? \
         GROUP BY DATE(recorded_at) ORDER BY day DESC LIMIT {USAGE_WINDOW_DAYS}"
    );
    let stmt = Statement::from_sql_and_values(
        state.db.get_database_backend(),
        sql,
        [machine_id.into()],
    );

    let rows = UsageRow::find_by_statement(stmt).all(state.db.as_ref()).await?;

    Ok(Json(daily_usage(rows.into_iter().map(|r| (r.day, r.used)))))
}

/// Turn newest-first `(day, spread)` rows into an oldest-first series.
///
/// Spreads are clamped at zero and rounded to two decimals; days without a
/// weight reading count as zero.
pub fn daily_usage(rows: impl IntoIterator<Item = (NaiveDate, Option<f64>)>) -> Vec<DailyUsage> {
    let mut usage: Vec<DailyUsage> = rows
        .into_iter()
        .map(|(date, used)| DailyUsage {
            date,
            usage: (used.unwrap_or(0.0).max(0.0) * 100.0).round() / 100.0,
        })
        .collect();
    usage.sort_by_key(|u| u.date);
    usage
}
