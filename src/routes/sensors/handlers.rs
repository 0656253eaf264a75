use axum::{
    extract::{Path, Query, State},
    Json,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

use crate::common::AppState;
use crate::entity::{machines, sensor_data};
use crate::error::{AppError, AppResult};
use crate::routes::extract::parse_id;
use crate::routes::machines::MachineSummary;

use super::types::{ReadingsQuery, SensorRowResponse};

/// Machines of a user, for the sensor dashboard picker
#[utoipa::path(
    get,
    path = "/api/sensors/machines/{user_id}",
    params(
        ("user_id" = i32, Path, description = "Owner user id"),
    ),
    responses(
        (status = 200, description = "Machines retrieved successfully", body = Vec<MachineSummary>),
        (status = 400, description = "Invalid user_id"),
    ),
    tag = "sensors"
)]
pub async fn list_user_machines(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<MachineSummary>>> {
    let user_id = parse_id(&user_id, "user_id")?;

    let machines_list = machines::Entity::find()
        .filter(machines::Column::UserId.eq(user_id))
        .order_by_asc(machines::Column::MachineId)
        .all(state.db.as_ref())
        .await?;

    Ok(Json(machines_list.into_iter().map(MachineSummary::from).collect()))
}

/// Synced readings of a machine, newest first
#[utoipa::path(
    get,
    path = "/api/sensors/sensor/{machine_id}",
    params(
        ("machine_id" = String, Path, description = "Machine key as reported by the device"),
        ReadingsQuery,
    ),
    responses(
        (status = 200, description = "Readings retrieved successfully", body = Vec<SensorRowResponse>),
        (status = 400, description = "Missing machine_id"),
    ),
    tag = "sensors"
)]
pub async fn machine_readings(
    State(state): State<AppState>,
    Path(machine_id): Path<String>,
    Query(query): Query<ReadingsQuery>,
) -> AppResult<Json<Vec<SensorRowResponse>>> {
    let machine_id = machine_id.trim();
    if machine_id.is_empty() {
        return Err(AppError::BadRequest("Invalid or missing machine_id".to_string()));
    }

    let rows = sensor_data::Entity::find()
        .filter(sensor_data::Column::MachineId.eq(machine_id))
        .order_by_desc(sensor_data::Column::RecordedAt)
        .order_by_desc(sensor_data::Column::SensorId)
        .limit(query.effective_limit())
        .all(state.db.as_ref())
        .await?;

    Ok(Json(rows.into_iter().map(SensorRowResponse::from).collect()))
}
