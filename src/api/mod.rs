//! API handlers for eLibrary REST endpoints

pub mod auth;
pub mod catalog;
pub mod health;
pub mod lookups;
pub mod openapi;
pub mod profile;
pub mod units;
pub mod users;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    routing::{get, post, put},
    RequestPartsExt, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Authentication("Missing or malformed bearer token".to_string()))?;

        let claims = UserClaims::from_token(bearer.token(), &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Authenticated user holding the staff flag
pub struct StaffUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for StaffUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(claims) = AuthenticatedUser::from_request_parts(parts, state).await?;
        claims.require_staff()?;
        Ok(StaffUser(claims))
    }
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/signup", post(auth::signup))
        .route("/auth/activate/:uidb64/:token", get(auth::activate))
        .route("/auth/activation/resend", post(auth::resend_activation))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        // Profile
        .route("/profile", get(profile::get_profile).put(profile::update_profile))
        .route("/profile/loans", get(profile::my_loans))
        // Account administration
        .route("/users/:id/staff", put(users::update_staff))
        // Address lookups
        .route("/cities", get(lookups::list_cities))
        .route("/streets", get(lookups::list_streets))
        // Catalog
        .route("/catalog/:selector", get(catalog::list_works).post(catalog::create_work))
        .route(
            "/catalog/:selector/:id",
            get(catalog::get_work)
                .put(catalog::update_work)
                .delete(catalog::delete_work),
        )
        // Library units
        .route("/units", get(units::list_units).post(units::create_unit))
        .route("/units/:id", get(units::get_unit).delete(units::delete_unit))
        .route("/units/:id/issue", post(units::issue_unit))
        .route("/units/:id/return", post(units::return_unit))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
