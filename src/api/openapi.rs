//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, catalog, health, lookups, profile, units, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "eLibrary API",
        version = "1.0.0",
        description = "Library management REST API: readers, catalog and lending"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::signup,
        auth::activate,
        auth::resend_activation,
        auth::login,
        auth::me,
        // Profile
        profile::get_profile,
        profile::update_profile,
        profile::my_loans,
        // Users
        users::update_staff,
        // Lookups
        lookups::list_cities,
        lookups::list_streets,
        // Catalog
        catalog::list_works,
        catalog::get_work,
        catalog::create_work,
        catalog::update_work,
        catalog::delete_work,
        // Units
        units::list_units,
        units::get_unit,
        units::create_unit,
        units::delete_unit,
        units::issue_unit,
        units::return_unit,
    ),
    components(
        schemas(
            // Auth
            crate::models::user::Account,
            crate::models::user::SignupForm,
            crate::models::user::SignupResponse,
            crate::models::user::ResendActivation,
            crate::models::user::LoginRequest,
            crate::models::user::LoginResponse,
            crate::models::user::UpdateStaff,
            auth::ActivationResponse,
            // Profile
            crate::models::address::ProfileView,
            crate::models::address::ProfileChanges,
            crate::models::address::ContactInfo,
            crate::models::address::AddressDetails,
            crate::models::address::LookupEntry,
            // Catalog
            crate::models::author::Author,
            crate::models::author::AuthorName,
            crate::models::work::WorkKind,
            crate::models::work::ArticleFields,
            crate::models::work::ScienceBookFields,
            crate::models::work::FictionBookFields,
            crate::models::work::Article,
            crate::models::work::ScienceBook,
            crate::models::work::FictionBook,
            crate::models::work::CatalogListing,
            crate::models::work::CatalogDetail,
            crate::models::work::AuthorLists,
            crate::models::work::ArticleChanges,
            crate::models::work::ScienceBookChanges,
            crate::models::work::FictionBookChanges,
            // Units
            crate::models::loan::WorkRef,
            crate::models::loan::LibraryUnit,
            crate::models::loan::CreateUnit,
            crate::models::loan::IssueUnit,
            crate::models::loan::LoanDetails,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Signup, activation and sessions"),
        (name = "profile", description = "Own profile and loans"),
        (name = "users", description = "Account administration"),
        (name = "lookups", description = "City and street choices"),
        (name = "catalog", description = "Articles, science books and fiction books"),
        (name = "units", description = "Loanable units, issue and return")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
