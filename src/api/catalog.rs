//! Catalog endpoints: listing and detail for readers, mutations for staff

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::work::{CatalogDetail, CatalogListing, Work},
    AppState,
};

use super::{AuthenticatedUser, StaffUser};

/// List works of one category
#[utoipa::path(
    get,
    path = "/catalog/{selector}",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(
        ("selector" = String, Path, description = "articles, science_books or fiction_books")
    ),
    responses(
        (status = 200, description = "Selected category filled, others empty; all empty for an unknown selector", body = CatalogListing),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_works(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(selector): Path<String>,
) -> AppResult<Json<CatalogListing>> {
    let listing = state.services.catalog.list(&selector).await?;
    Ok(Json(listing))
}

/// Get one work with its authors
#[utoipa::path(
    get,
    path = "/catalog/{selector}/{id}",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(
        ("selector" = String, Path, description = "articles, science_books or fiction_books"),
        ("id" = i32, Path, description = "Work ID")
    ),
    responses(
        (status = 200, description = "Work in its slot, others null; all null for an unknown selector", body = CatalogDetail),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Work not found")
    )
)]
pub async fn get_work(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path((selector, id)): Path<(String, i32)>,
) -> AppResult<Json<CatalogDetail>> {
    let detail = state.services.catalog.detail(&selector, id).await?;
    Ok(Json(detail))
}

/// Add a work and its authors
#[utoipa::path(
    post,
    path = "/catalog/{selector}",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(
        ("selector" = String, Path, description = "articles, science_books or fiction_books")
    ),
    request_body(
        content = crate::models::work::AuthorLists,
        description = "Fields of the selected kind (ArticleFields, ScienceBookFields or FictionBookFields) plus comma-separated author_name and author_surname"
    ),
    responses(
        (status = 201, description = "Work created", body = CatalogDetail),
        (status = 400, description = "Invalid form", body = crate::error::ErrorResponse),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Unknown work type")
    )
)]
pub async fn create_work(
    State(state): State<AppState>,
    StaffUser(_claims): StaffUser,
    Path(kind): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> AppResult<(StatusCode, Json<CatalogDetail>)> {
    let work: Work = state.services.catalog.add(&kind, body).await?;
    Ok((StatusCode::CREATED, Json(work.into())))
}

/// Update a work; authors are renamed by position
#[utoipa::path(
    put,
    path = "/catalog/{selector}/{id}",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(
        ("selector" = String, Path, description = "articles, science_books or fiction_books"),
        ("id" = i32, Path, description = "Work ID")
    ),
    request_body(
        content = crate::models::work::ArticleChanges,
        description = "Changed fields of the selected kind, plus an optional `authors` list of {name, surname} with one entry per current author"
    ),
    responses(
        (status = 200, description = "Updated work", body = CatalogDetail),
        (status = 400, description = "Invalid form", body = crate::error::ErrorResponse),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Work not found or unknown work type")
    )
)]
pub async fn update_work(
    State(state): State<AppState>,
    StaffUser(_claims): StaffUser,
    Path((kind, id)): Path<(String, i32)>,
    Json(body): Json<serde_json::Value>,
) -> AppResult<Json<CatalogDetail>> {
    let work = state.services.catalog.edit(&kind, id, body).await?;
    Ok(Json(work.into()))
}

/// Delete a work
#[utoipa::path(
    delete,
    path = "/catalog/{selector}/{id}",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(
        ("selector" = String, Path, description = "articles, science_books or fiction_books"),
        ("id" = i32, Path, description = "Work ID")
    ),
    responses(
        (status = 204, description = "Work deleted"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Work not found or unknown work type")
    )
)]
pub async fn delete_work(
    State(state): State<AppState>,
    StaffUser(_claims): StaffUser,
    Path((kind, id)): Path<(String, i32)>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete(&kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
