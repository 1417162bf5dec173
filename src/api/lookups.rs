//! City and street choices for address forms

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::address::{LookupEntry, LookupTable},
    AppState,
};

/// List known cities
#[utoipa::path(
    get,
    path = "/cities",
    tag = "lookups",
    responses(
        (status = 200, description = "Cities ordered by name", body = Vec<LookupEntry>)
    )
)]
pub async fn list_cities(State(state): State<AppState>) -> AppResult<Json<Vec<LookupEntry>>> {
    Ok(Json(state.services.lookups.list(LookupTable::City).await?))
}

/// List known streets
#[utoipa::path(
    get,
    path = "/streets",
    tag = "lookups",
    responses(
        (status = 200, description = "Streets ordered by name", body = Vec<LookupEntry>)
    )
)]
pub async fn list_streets(State(state): State<AppState>) -> AppResult<Json<Vec<LookupEntry>>> {
    Ok(Json(state.services.lookups.list(LookupTable::Street).await?))
}
