use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::common::AppState;
use crate::entity::{cylinders, machines, users};
use crate::error::{AppError, AppResult};
use crate::routes::extract::{json_id, non_blank, parse_id, ApiJson};
use crate::routes::load_owned_machine;

use super::types::{
    CreateMachineResponse, MachineRequest, MachineResponse, MachineSummary, MessageResponse,
    OwnerQuery,
};

/// List every machine
#[utoipa::path(
    get,
    path = "/api/machines",
    responses(
        (status = 200, description = "Machines retrieved successfully", body = Vec<MachineSummary>),
    ),
    tag = "machines"
)]
pub async fn list_machines(State(state): State<AppState>) -> AppResult<Json<Vec<MachineSummary>>> {
    let machines_list = machines::Entity::find()
        .order_by_asc(machines::Column::MachineId)
        .all(state.db.as_ref())
        .await?;

    Ok(Json(machines_list.into_iter().map(MachineSummary::from).collect()))
}

/// Register a machine for a user
#[utoipa::path(
    post,
    path = "/api/machines",
    request_body = MachineRequest,
    responses(
        (status = 201, description = "Machine added", body = CreateMachineResponse),
        (status = 400, description = "Invalid or missing fields"),
        (status = 404, description = "User not found"),
    ),
    tag = "machines"
)]
pub async fn create_machine(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<MachineRequest>,
) -> AppResult<(StatusCode, Json<CreateMachineResponse>)> {
    let user_id = json_id(body.user_id.as_ref())
        .ok_or_else(|| AppError::BadRequest("Invalid or missing user_id".to_string()))?;
    let machine_name = non_blank(body.machine_name)
        .ok_or_else(|| AppError::BadRequest("machine_name is required".to_string()))?;

    if users::Entity::find_by_id(user_id)
        .one(state.db.as_ref())
        .await?
        .is_none()
    {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let machine = machines::ActiveModel {
        machine_id: NotSet,
        user_id: Set(user_id),
        machine_name: Set(machine_name),
        serial_number: Set(non_blank(body.serial_number)),
        location: Set(non_blank(body.location)),
        created_at: Set(Some(Utc::now())),
    };

    let result = machines::Entity::insert(machine).exec(state.db.as_ref()).await?;

    tracing::info!(machine_id = result.last_insert_id, user_id, "Machine added");

    Ok((
        StatusCode::CREATED,
        Json(CreateMachineResponse {
            message: "Machine added successfully".to_string(),
            machine_id: result.last_insert_id,
        }),
    ))
}

/// List machines owned by a user
#[utoipa::path(
    get,
    path = "/api/machines/user/{user_id}",
    params(
        ("user_id" = i32, Path, description = "Owner user id"),
    ),
    responses(
        (status = 200, description = "Machines retrieved successfully", body = Vec<MachineResponse>),
        (status = 400, description = "Invalid user_id"),
    ),
    tag = "machines"
)]
pub async fn list_user_machines(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<MachineResponse>>> {
    let user_id = parse_id(&user_id, "user_id")?;

    let machines_list = machines::Entity::find()
        .filter(machines::Column::UserId.eq(user_id))
        .order_by_asc(machines::Column::MachineId)
        .all(state.db.as_ref())
        .await?;

    Ok(Json(machines_list.into_iter().map(MachineResponse::from).collect()))
}

/// Update a machine owned by the requesting user
#[utoipa::path(
    put,
    path = "/api/machines/{machine_id}",
    params(
        ("machine_id" = i32, Path, description = "Machine id"),
    ),
    request_body = MachineRequest,
    responses(
        (status = 200, description = "Machine updated", body = MessageResponse),
        (status = 400, description = "Invalid user_id or machine_id"),
        (status = 403, description = "Machine belongs to another user"),
        (status = 404, description = "Machine not found"),
    ),
    tag = "machines"
)]
pub async fn update_machine(
    State(state): State<AppState>,
    Path(machine_id): Path<String>,
    ApiJson(body): ApiJson<MachineRequest>,
) -> AppResult<Json<MessageResponse>> {
    let (Some(user_id), Ok(machine_id)) = (
        json_id(body.user_id.as_ref()),
        parse_id(&machine_id, "machine_id"),
    ) else {
        return Err(AppError::BadRequest(
            "Invalid user_id or machine_id".to_string(),
        ));
    };
    let machine_name = non_blank(body.machine_name)
        .ok_or_else(|| AppError::BadRequest("machine_name is required".to_string()))?;

    load_owned_machine(&state.db, machine_id, user_id).await?;

    machines::Entity::update_many()
        .col_expr(machines::Column::MachineName, Expr::value(machine_name))
        .col_expr(
            machines::Column::SerialNumber,
            Expr::value(non_blank(body.serial_number)),
        )
        .col_expr(machines::Column::Location, Expr::value(non_blank(body.location)))
        .filter(machines::Column::MachineId.eq(machine_id))
        .exec(state.db.as_ref())
        .await?;

    tracing::info!(machine_id, user_id, "Machine updated");

    Ok(Json(MessageResponse::new("Machine updated successfully")))
}

/// Delete a machine owned by the requesting user
///
/// Refused with 409 while a cylinder is still assigned to the machine.
#[utoipa::path(
    delete,
    path = "/api/machines/{machine_id}",
    params(
        ("machine_id" = i32, Path, description = "Machine id"),
        OwnerQuery,
    ),
    responses(
        (status = 200, description = "Machine deleted", body = MessageResponse),
        (status = 400, description = "Missing or invalid user_id or machine_id"),
        (status = 403, description = "Machine belongs to another user"),
        (status = 404, description = "Machine not found"),
        (status = 409, description = "Machine is in use by a cylinder"),
    ),
    tag = "machines"
)]
pub async fn delete_machine(
    State(state): State<AppState>,
    Path(machine_id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> AppResult<Json<MessageResponse>> {
    let (Ok(user_id), Ok(machine_id)) = (
        parse_id(query.user_id.as_deref().unwrap_or_default(), "user_id"),
        parse_id(&machine_id, "machine_id"),
    ) else {
        return Err(AppError::BadRequest(
            "Missing or invalid user_id or machine_id".to_string(),
        ));
    };

    tracing::debug!(machine_id, user_id, "Delete machine requested");

    load_owned_machine(&state.db, machine_id, user_id).await?;

    let in_use = cylinders::Entity::find()
        .filter(cylinders::Column::MachineId.eq(machine_id))
        .one(state.db.as_ref())
        .await?;
    if in_use.is_some() {
        return Err(AppError::Conflict(
            "Machine is in use by a cylinder and cannot be deleted.".to_string(),
        ));
    }

    machines::Entity::delete_by_id(machine_id)
        .exec(state.db.as_ref())
        .await?;

    tracing::info!(machine_id, user_id, "Machine deleted");

    Ok(Json(MessageResponse::new("Machine deleted successfully")))
}
