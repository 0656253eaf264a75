use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use sea_orm::{
    sea_query::Expr, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use serde_json::Value;

use crate::common::AppState;
use crate::entity::{cylinders, machines};
use crate::error::{AppError, AppResult};
use crate::routes::extract::{json_date, json_id, json_number, parse_id, ApiJson};
use crate::routes::load_owned_machine;
use crate::routes::machines::{MessageResponse, OwnerQuery};

use super::types::{CreateCylinderResponse, CylinderRequest, CylinderResponse};

struct CylinderFields {
    user_id: i32,
    machine_id: i32,
    gas_weight: f64,
    replaced_date: NaiveDate,
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    })
}

fn validate(body: &CylinderRequest) -> AppResult<CylinderFields> {
    let (Some(user_id), Some(machine_id), Some(gas_weight), Some(replaced_date)) = (
        present(body.user_id.as_ref()),
        present(body.machine_id.as_ref()),
        present(body.gas_weight.as_ref()),
        present(body.replaced_date.as_ref()),
    ) else {
        return Err(AppError::BadRequest("All fields are required.".to_string()));
    };

    let (Some(user_id), Some(machine_id)) = (json_id(Some(user_id)), json_id(Some(machine_id)))
    else {
        return Err(AppError::BadRequest(
            "Invalid user_id or machine_id.".to_string(),
        ));
    };
    let gas_weight = json_number(Some(gas_weight))
        .filter(|w| *w > 0.0)
        .ok_or_else(|| AppError::BadRequest("gas_weight must be a positive number.".to_string()))?;
    let replaced_date = json_date(Some(replaced_date))
        .ok_or_else(|| AppError::BadRequest("Invalid replaced_date format.".to_string()))?;

    Ok(CylinderFields {
        user_id,
        machine_id,
        gas_weight,
        replaced_date,
    })
}

/// 409 unless `machine_id` has no cylinder other than `except`.
async fn ensure_machine_free(
    db: &DatabaseConnection,
    machine_id: i32,
    except: Option<i32>,
) -> AppResult<()> {
    let mut query = cylinders::Entity::find().filter(cylinders::Column::MachineId.eq(machine_id));
    if let Some(cylinder_id) = except {
        query = query.filter(cylinders::Column::CylinderId.ne(cylinder_id));
    }

    if query.one(db).await?.is_some() {
        return Err(AppError::Conflict(
            "This machine already has a cylinder assigned.".to_string(),
        ));
    }
    Ok(())
}

/// Load a cylinder whose machine belongs to `user_id`.
async fn load_owned_cylinder(
    db: &DatabaseConnection,
    cylinder_id: i32,
    user_id: i32,
) -> AppResult<cylinders::Model> {
    let (cylinder, machine) = cylinders::Entity::find_by_id(cylinder_id)
        .find_also_related(machines::Entity)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Cylinder not found.".to_string()))?;

    match machine {
        Some(machine) if machine.user_id == user_id => Ok(cylinder),
        _ => Err(AppError::Forbidden(
            "Unauthorized: You do not own this cylinder".to_string(),
        )),
    }
}

/// Record a cylinder on a machine
#[utoipa::path(
    post,
    path = "/api/cylinders",
    request_body = CylinderRequest,
    responses(
        (status = 201, description = "Cylinder added", body = CreateCylinderResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Machine belongs to another user"),
        (status = 404, description = "Machine not found"),
        (status = 409, description = "Machine already has a cylinder"),
    ),
    tag = "cylinders"
)]
pub async fn create_cylinder(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CylinderRequest>,
) -> AppResult<(StatusCode, Json<CreateCylinderResponse>)> {
    let fields = validate(&body)?;

    load_owned_machine(&state.db, fields.machine_id, fields.user_id).await?;
    ensure_machine_free(&state.db, fields.machine_id, None).await?;

    let cylinder = cylinders::ActiveModel {
        cylinder_id: NotSet,
        machine_id: Set(fields.machine_id),
        gas_weight: Set(fields.gas_weight),
        replaced_date: Set(fields.replaced_date),
    };
    let result = cylinders::Entity::insert(cylinder).exec(state.db.as_ref()).await?;

    tracing::info!(
        cylinder_id = result.last_insert_id,
        machine_id = fields.machine_id,
        "Cylinder added"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateCylinderResponse {
            message: "Cylinder entry added successfully!".to_string(),
            cylinder_id: result.last_insert_id,
        }),
    ))
}

/// List a user's cylinders, most recently replaced first
#[utoipa::path(
    get,
    path = "/api/cylinders/user/{user_id}",
    params(
        ("user_id" = i32, Path, description = "Owner user id"),
    ),
    responses(
        (status = 200, description = "Cylinders retrieved successfully", body = Vec<CylinderResponse>),
        (status = 400, description = "Invalid user_id"),
    ),
    tag = "cylinders"
)]
pub async fn list_user_cylinders(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<CylinderResponse>>> {
    let user_id = parse_id(&user_id, "user_id")?;

    let rows = cylinders::Entity::find()
        .find_also_related(machines::Entity)
        .filter(machines::Column::UserId.eq(user_id))
        .order_by_desc(cylinders::Column::ReplacedDate)
        .order_by_desc(cylinders::Column::CylinderId)
        .all(state.db.as_ref())
        .await?;

    Ok(Json(
        rows.into_iter()
            .map(|(cylinder, machine)| CylinderResponse::new(cylinder, machine))
            .collect(),
    ))
}

/// Update a cylinder, possibly moving it to another machine of the same user
#[utoipa::path(
    put,
    path = "/api/cylinders/{cylinder_id}",
    params(
        ("cylinder_id" = i32, Path, description = "Cylinder id"),
    ),
    request_body = CylinderRequest,
    responses(
        (status = 200, description = "Cylinder updated", body = MessageResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Cylinder or target machine belongs to another user"),
        (status = 404, description = "Cylinder or target machine not found"),
        (status = 409, description = "Target machine already has a cylinder"),
    ),
    tag = "cylinders"
)]
pub async fn update_cylinder(
    State(state): State<AppState>,
    Path(cylinder_id): Path<String>,
    ApiJson(body): ApiJson<CylinderRequest>,
) -> AppResult<Json<MessageResponse>> {
    let cylinder_id = parse_id(&cylinder_id, "cylinder_id")?;
    let fields = validate(&body)?;

    load_owned_cylinder(&state.db, cylinder_id, fields.user_id).await?;
    load_owned_machine(&state.db, fields.machine_id, fields.user_id).await?;
    ensure_machine_free(&state.db, fields.machine_id, Some(cylinder_id)).await?;

    cylinders::Entity::update_many()
        .col_expr(cylinders::Column::MachineId, Expr::value(fields.machine_id))
        .col_expr(cylinders::Column::GasWeight, Expr::value(fields.gas_weight))
        .col_expr(
            cylinders::Column::ReplacedDate,
            Expr::value(fields.replaced_date),
        )
        .filter(cylinders::Column::CylinderId.eq(cylinder_id))
        .exec(state.db.as_ref())
        .await?;

    tracing::info!(cylinder_id, machine_id = fields.machine_id, "Cylinder updated");

    Ok(Json(MessageResponse::new("Cylinder updated successfully!")))
}

/// Delete a cylinder owned by the requesting user
#[utoipa::path(
    delete,
    path = "/api/cylinders/{cylinder_id}",
    params(
        ("cylinder_id" = i32, Path, description = "Cylinder id"),
        OwnerQuery,
    ),
    responses(
        (status = 200, description = "Cylinder deleted", body = MessageResponse),
        (status = 400, description = "Missing user_id"),
        (status = 403, description = "Cylinder belongs to another user"),
        (status = 404, description = "Cylinder not found"),
    ),
    tag = "cylinders"
)]
pub async fn delete_cylinder(
    State(state): State<AppState>,
    Path(cylinder_id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> AppResult<Json<MessageResponse>> {
    let user_id = parse_id(query.user_id.as_deref().unwrap_or_default(), "user_id")
        .map_err(|_| AppError::BadRequest("User ID is required.".to_string()))?;
    let cylinder_id = parse_id(&cylinder_id, "cylinder_id")?;

    load_owned_cylinder(&state.db, cylinder_id, user_id).await?;

    cylinders::Entity::delete_by_id(cylinder_id)
        .exec(state.db.as_ref())
        .await?;

    tracing::info!(cylinder_id, user_id, "Cylinder deleted");

    Ok(Json(MessageResponse::new("Cylinder deleted successfully!")))
}
