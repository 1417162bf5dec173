//! Profile endpoints of the signed-in user

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::{
        address::{ProfileChanges, ProfileView},
        loan::LoanDetails,
    },
    AppState,
};

use super::AuthenticatedUser;

/// Get own profile
#[utoipa::path(
    get,
    path = "/profile",
    tag = "profile",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile with contact info and address", body = ProfileView),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<ProfileView>> {
    let profile = state.services.users.profile(claims.user_id).await?;
    Ok(Json(profile))
}

/// Update own profile (only the provided fields)
#[utoipa::path(
    put,
    path = "/profile",
    tag = "profile",
    security(("bearer_auth" = [])),
    request_body = ProfileChanges,
    responses(
        (status = 200, description = "Updated profile", body = ProfileView),
        (status = 400, description = "Invalid form", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Contact info, address, or picked city/street missing")
    )
)]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(changes): Json<ProfileChanges>,
) -> AppResult<Json<ProfileView>> {
    let profile = state.services.users.edit_profile(claims.user_id, changes).await?;
    Ok(Json(profile))
}

/// Own loan history
#[utoipa::path(
    get,
    path = "/profile/loans",
    tag = "profile",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Loans, most recent first", body = Vec<LoanDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.lending.loans_for(claims.user_id).await?;
    Ok(Json(loans))
}
