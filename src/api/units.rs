//! Library unit endpoints: inventory and issue/return

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::loan::{CreateUnit, IssueUnit, LibraryUnit, LoanDetails},
    AppState,
};

use super::{AuthenticatedUser, StaffUser};

/// List all units
#[utoipa::path(
    get,
    path = "/units",
    tag = "units",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All library units", body = Vec<LibraryUnit>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_units(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LibraryUnit>>> {
    Ok(Json(state.services.lending.list_units().await?))
}

/// Get one unit
#[utoipa::path(
    get,
    path = "/units/{id}",
    tag = "units",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Unit ID")),
    responses(
        (status = 200, description = "Library unit", body = LibraryUnit),
        (status = 404, description = "Unit not found")
    )
)]
pub async fn get_unit(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LibraryUnit>> {
    Ok(Json(state.services.lending.get_unit(id).await?))
}

/// Create a unit for a work
#[utoipa::path(
    post,
    path = "/units",
    tag = "units",
    security(("bearer_auth" = [])),
    request_body = CreateUnit,
    responses(
        (status = 201, description = "Unit created", body = LibraryUnit),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Work not found")
    )
)]
pub async fn create_unit(
    State(state): State<AppState>,
    StaffUser(_claims): StaffUser,
    Json(request): Json<CreateUnit>,
) -> AppResult<(StatusCode, Json<LibraryUnit>)> {
    let unit = state.services.lending.create_unit(request).await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

/// Delete a unit
#[utoipa::path(
    delete,
    path = "/units/{id}",
    tag = "units",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Unit ID")),
    responses(
        (status = 204, description = "Unit deleted"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Unit not found")
    )
)]
pub async fn delete_unit(
    State(state): State<AppState>,
    StaffUser(_claims): StaffUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.lending.delete_unit(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Issue a unit to a reader
#[utoipa::path(
    post,
    path = "/units/{id}/issue",
    tag = "units",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Unit ID")),
    request_body = IssueUnit,
    responses(
        (status = 201, description = "Unit issued", body = LoanDetails),
        (status = 400, description = "Invalid request or inactive account", body = crate::error::ErrorResponse),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Unit or user not found"),
        (status = 409, description = "Unit not available")
    )
)]
pub async fn issue_unit(
    State(state): State<AppState>,
    StaffUser(_claims): StaffUser,
    Path(id): Path<i32>,
    Json(request): Json<IssueUnit>,
) -> AppResult<(StatusCode, Json<LoanDetails>)> {
    let loan = state.services.lending.issue(id, request).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Record the return of a unit
#[utoipa::path(
    post,
    path = "/units/{id}/return",
    tag = "units",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Unit ID")),
    responses(
        (status = 200, description = "Unit returned", body = LoanDetails),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Unit not found"),
        (status = 409, description = "Unit is not issued")
    )
)]
pub async fn return_unit(
    State(state): State<AppState>,
    StaffUser(_claims): StaffUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    Ok(Json(state.services.lending.return_unit(id).await?))
}
