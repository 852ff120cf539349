//! Route Configuration
//!
//! Configures all HTTP routes for the API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use super::handlers;
use crate::presentation::middleware::{
    create_cors_layer, optional_auth, protect, rate_limit, require_admin, require_staff,
    track_metrics, SecurityHeadersLayer,
};
use crate::presentation::realtime::realtime_handler;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let settings = state.settings.clone();

    // Layers added last run first
    Router::new()
        .nest("/api", api_routes(state.clone()))
        .route("/realtime", get(realtime_handler))
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        .route("/metrics", get(handlers::health::metrics_handler))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(settings.server.body_limit))
        .layer(middleware::from_fn(track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(create_cors_layer(&settings.cors))
        .layer(SecurityHeadersLayer::new(settings.is_production()))
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    AppError::NotFound("Not found".into())
}

/// `/api` routes, rate limited per client
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes(state.clone()))
        .nest("/users", user_routes(state.clone()))
        .nest("/categories", category_routes(state.clone()))
        .nest("/threads", thread_routes(state.clone()))
        .nest("/posts", post_routes(state.clone()))
        .nest("/notifications", notification_routes(state.clone()))
        .nest("/ads", ad_routes(state.clone()))
        .route_layer(middleware::from_fn_with_state(state, rate_limit))
}

fn protected(state: &AppState, router: Router<AppState>) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(state.clone(), protect))
}

fn admin_only(state: &AppState, router: Router<AppState>) -> Router<AppState> {
    protected(state, router.route_layer(middleware::from_fn(require_admin)))
}

fn staff_only(state: &AppState, router: Router<AppState>) -> Router<AppState> {
    protected(state, router.route_layer(middleware::from_fn(require_staff)))
}

fn with_optional_auth(state: &AppState, router: Router<AppState>) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(state.clone(), optional_auth))
}

fn auth_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/logout", get(handlers::auth::logout))
        .route("/forgotpassword", post(handlers::auth::forgot_password))
        .route("/resetpassword/{resettoken}", put(handlers::auth::reset_password))
        .route(
            "/verify-email/{verificationtoken}",
            get(handlers::auth::verify_email),
        )
        .route("/social/{provider}", post(handlers::auth::social_login));

    let private = Router::new()
        .route("/me", get(handlers::auth::me))
        .route("/updatedetails", put(handlers::auth::update_details))
        .route("/updatepassword", put(handlers::auth::update_password));

    public.merge(protected(&state, private))
}

fn user_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/{id}", get(handlers::user::get_user))
        .route("/username/{username}", get(handlers::user::get_user_by_username))
        .route("/{id}/threads", get(handlers::user::get_user_threads))
        .route("/{id}/posts", get(handlers::user::get_user_posts));

    let private = Router::new().route(
        "/{id}",
        put(handlers::user::update_user).delete(handlers::user::delete_user),
    );

    let admin = Router::new().route("/", get(handlers::user::list_users));

    with_optional_auth(&state, public)
        .merge(protected(&state, private))
        .merge(admin_only(&state, admin))
}

fn category_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(handlers::category::list_categories))
        .route("/{id}", get(handlers::category::get_category))
        .route("/slug/{slug}", get(handlers::category::get_category_by_slug))
        .route("/{id}/threads", get(handlers::category::get_category_threads));

    let admin = Router::new()
        .route("/", post(handlers::category::create_category))
        .route("/reorder", put(handlers::category::reorder_categories))
        .route(
            "/{id}",
            put(handlers::category::update_category).delete(handlers::category::delete_category),
        );

    with_optional_auth(&state, public).merge(admin_only(&state, admin))
}

fn thread_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(handlers::thread::list_threads))
        .route("/search", get(handlers::thread::search_threads))
        .route("/{id}", get(handlers::thread::get_thread))
        .route("/slug/{slug}", get(handlers::thread::get_thread_by_slug))
        .route("/{id}/posts", get(handlers::thread::get_thread_posts));

    let private = Router::new()
        .route("/", post(handlers::thread::create_thread))
        .route(
            "/{id}",
            put(handlers::thread::update_thread).delete(handlers::thread::delete_thread),
        );

    let staff = Router::new()
        .route("/{id}/sticky", put(handlers::thread::toggle_sticky))
        .route("/{id}/lock", put(handlers::thread::toggle_lock));

    with_optional_auth(&state, public)
        .merge(protected(&state, private))
        .merge(staff_only(&state, staff))
}

fn post_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(handlers::post::list_posts))
        .route("/search", get(handlers::post::search_posts))
        .route("/{id}", get(handlers::post::get_post));

    let private = Router::new()
        .route("/", post(handlers::post::create_post))
        .route(
            "/{id}",
            put(handlers::post::update_post).delete(handlers::post::delete_post),
        )
        .route("/{id}/like", put(handlers::post::toggle_like));

    with_optional_auth(&state, public).merge(protected(&state, private))
}

fn notification_routes(state: AppState) -> Router<AppState> {
    let routes = Router::new()
        .route(
            "/",
            get(handlers::notification::list_notifications)
                .delete(handlers::notification::delete_all_notifications),
        )
        .route("/unread/count", get(handlers::notification::unread_count))
        .route("/read-all", put(handlers::notification::mark_all_read))
        .route("/{id}/read", put(handlers::notification::mark_read))
        .route("/{id}", delete(handlers::notification::delete_notification));

    protected(&state, routes)
}

fn ad_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(handlers::ad::list_active_ads))
        .route("/location/{location}", get(handlers::ad::list_ads_by_location))
        .route("/{id}/impression", put(handlers::ad::record_impression))
        .route("/{id}/click", put(handlers::ad::record_click));

    let admin = Router::new()
        .route("/", post(handlers::ad::create_ad))
        .route("/stats", get(handlers::ad::ad_stats))
        .route(
            "/{id}",
            get(handlers::ad::get_ad)
                .put(handlers::ad::update_ad)
                .delete(handlers::ad::delete_ad),
        );

    public.merge(admin_only(&state, admin))
}
