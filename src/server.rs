//! Router assembly. Lives in the library (rather than `main.rs`) so the
//! integration tests can drive the app with `tower::ServiceExt::oneshot`.

use axum::{
    extract::Request,
    middleware::{self, Next},
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::middleware::{current_user_middleware, jwt_auth_middleware, require};

pub fn app() -> Router {
    let protected = Router::new()
        .merge(auth_routes())
        .merge(profile_routes())
        .merge(training_routes())
        .merge(course_routes())
        .merge(admin_routes())
        // Inner layer runs second: fresh DB state gating on top of JWT auth
        .route_layer(middleware::from_fn(current_user_middleware))
        .route_layer(middleware::from_fn(jwt_auth_middleware));

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_auth_routes())
        .merge(protected)
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn public_auth_routes() -> Router {
    use handlers::public::auth;

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/verify", post(auth::verify))
}

fn auth_routes() -> Router {
    use handlers::protected::auth;

    Router::new()
        .route("/api/auth/whoami", get(auth::whoami))
        .route("/api/auth/session", delete(auth::logout))
        .route("/api/auth/password", put(auth::change_password))
}

fn profile_routes() -> Router {
    use handlers::protected::profile;

    Router::new()
        .route("/api/profile", get(profile::get_profile).put(profile::update_profile))
        .route("/api/profile/dashboard", get(profile::dashboard))
}

fn training_routes() -> Router {
    use handlers::protected::training;

    let manage = Router::new()
        .route("/api/training/all", get(training::list_all_needs))
        .route("/api/training/needs/:id/decision", post(training::decide_need))
        .route("/api/training/needs/:id/complete", post(training::complete_need))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            require("training:manage", req, next)
        }));

    Router::new()
        .route(
            "/api/training/needs",
            get(training::list_needs).post(training::create_need),
        )
        .route(
            "/api/training/needs/:id",
            get(training::get_need).delete(training::delete_need),
        )
        .merge(manage)
}

fn course_routes() -> Router {
    use handlers::protected::courses;

    let manage = Router::new()
        .route("/api/courses", post(courses::create_course))
        .route(
            "/api/courses/:id",
            put(courses::update_course).delete(courses::deactivate_course),
        )
        .route("/api/courses/:id/restore", post(courses::restore_course))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            require("courses:manage", req, next)
        }));

    Router::new()
        .route("/api/courses", get(courses::list_courses))
        .route("/api/courses/:id", get(courses::get_course))
        .merge(manage)
}

fn admin_routes() -> Router {
    use handlers::admin::users;

    Router::new()
        .route("/api/admin/users", get(users::list_users))
        .route("/api/admin/users/:id", get(users::get_user).delete(users::deactivate))
        .route("/api/admin/users/:id/role", put(users::set_role))
        .route("/api/admin/users/:id/unlock", post(users::unlock))
        .route("/api/admin/users/:id/restore", post(users::restore))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            require("users:manage", req, next)
        }))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "AEP API",
            "version": version,
            "description": "Training-management backend: authentication, RBAC, profile dashboard",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "public_auth": "/auth/register, /auth/login, /auth/refresh, /auth/verify (public)",
                "auth": "/api/auth/* (protected - session management)",
                "profile": "/api/profile[/dashboard] (protected)",
                "training": "/api/training/needs[/:id] (protected), /api/training/all (training:manage)",
                "courses": "/api/courses[/:id] (protected; writes require courses:manage)",
                "admin": "/api/admin/users[/:id] (users:manage)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match crate::database::DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
