pub mod cylinders;
pub mod extract;
pub mod health;
pub mod machines;
mod rate_limit;
pub mod sensors;
pub mod users;

use axum::{
    routing::{get, post, put},
    Router,
};
use sea_orm::{DatabaseConnection, EntityTrait};
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use rate_limit::ClientIpKeyExtractor;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::common::AppState;
use crate::entity::machines as machine_entity;
use crate::error::{AppError, AppResult};

/// Load a machine and check that `user_id` owns it.
///
/// # Errors
///
/// `NotFound` if the machine does not exist, `Forbidden` if another user owns it.
pub async fn load_owned_machine(
    db: &DatabaseConnection,
    machine_id: i32,
    user_id: i32,
) -> AppResult<machine_entity::Model> {
    let machine = machine_entity::Entity::find_by_id(machine_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Machine not found".to_string()))?;

    if machine.user_id != user_id {
        tracing::warn!(machine_id, user_id, owner = machine.user_id, "Ownership check failed");
        return Err(AppError::Forbidden(
            "Unauthorized: You do not own this machine".to_string(),
        ));
    }

    Ok(machine)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthz,
        users::register,
        users::login,
        machines::list_machines,
        machines::create_machine,
        machines::list_user_machines,
        machines::update_machine,
        machines::delete_machine,
        machines::machine_usage,
        cylinders::create_cylinder,
        cylinders::list_user_cylinders,
        cylinders::update_cylinder,
        cylinders::delete_cylinder,
        sensors::list_user_machines,
        sensors::machine_readings,
    ),
    components(
        schemas(
            health::HealthResponse,
            crate::sync::ListenerState,
            users::RegisterRequest,
            users::RegisterResponse,
            users::LoginRequest,
            users::LoginResponse,
            machines::MachineRequest,
            machines::MachineSummary,
            machines::MachineResponse,
            machines::CreateMachineResponse,
            machines::MessageResponse,
            machines::DailyUsage,
            cylinders::CylinderRequest,
            cylinders::CylinderResponse,
            cylinders::CreateCylinderResponse,
            sensors::SensorRowResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "Registration and login"),
        (name = "machines", description = "Gas machines and their usage"),
        (name = "cylinders", description = "LPG cylinders fitted to machines"),
        (name = "sensors", description = "Readings synced from the devices"),
    ),
    info(
        title = "FlameShield API",
        description = "LPG cylinder monitoring: users, machines, cylinders and synced sensor readings",
        version = "0.1.0"
    )
)]
struct ApiDoc;

pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    let api_routes_base = Router::new()
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
        .route(
            "/machines",
            get(machines::list_machines).post(machines::create_machine),
        )
        .route("/machines/user/{user_id}", get(machines::list_user_machines))
        .route(
            "/machines/{machine_id}",
            put(machines::update_machine).delete(machines::delete_machine),
        )
        .route("/machines/{machine_id}/usage", get(machines::machine_usage))
        .route("/cylinders", post(cylinders::create_cylinder))
        .route(
            "/cylinders/user/{user_id}",
            get(cylinders::list_user_cylinders),
        )
        .route(
            "/cylinders/{cylinder_id}",
            put(cylinders::update_cylinder).delete(cylinders::delete_cylinder),
        )
        .route(
            "/sensors/machines/{user_id}",
            get(sensors::list_user_machines),
        )
        .route(
            "/sensors/sensor/{machine_id}",
            get(sensors::machine_readings),
        );

    let api_routes = if config.disable_rate_limiting {
        tracing::warn!("Rate limiting DISABLED");
        api_routes_base
    } else {
        tracing::info!(
            rate = %format!("{}/s burst {}", config.rate_limit_per_second, config.rate_limit_burst),
            trust_proxy_headers = config.trust_proxy_headers,
            "Rate limiting configured"
        );

        let limiter = GovernorConfigBuilder::default()
            .key_extractor(ClientIpKeyExtractor {
                trust_proxy_headers: config.trust_proxy_headers,
            })
            .per_second(config.rate_limit_per_second)
            .burst_size(config.rate_limit_burst)
            .finish()
            .expect("Failed to create rate limiter");

        api_routes_base.layer(GovernorLayer {
            config: Arc::new(limiter),
        })
    }
    .layer(RequestBodyLimitLayer::new(1024 * 1024)); // 1MB body limit

    // Health check routes (NO rate limiting)
    let health_routes = Router::new().route("/healthz", get(health::healthz));

    let docs_routes = Router::new().merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(docs_routes)
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
