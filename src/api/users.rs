//! Account administration

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::AppResult,
    models::user::{Account, UpdateStaff},
    AppState,
};

use super::StaffUser;

/// Grant or revoke the staff flag
#[utoipa::path(
    put,
    path = "/users/{id}/staff",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Account ID")),
    request_body = UpdateStaff,
    responses(
        (status = 200, description = "Staff flag updated", body = Account),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Staff privileges required"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_staff(
    State(state): State<AppState>,
    StaffUser(_claims): StaffUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateStaff>,
) -> AppResult<Json<Account>> {
    let account = state.services.users.set_staff(id, request.is_staff).await?;
    Ok(Json(account))
}
