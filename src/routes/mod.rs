use axum::{Json, Router, routing::get};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa_axum::router::OpenApiRouter;

use crate::app_state::AppState;

pub mod cart;
pub mod categories;
pub mod groups;
pub mod menu_items;
pub mod orders;

/// Every gateway route, with its OpenAPI description.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    menu_items::routes_with_openapi()
        .merge(categories::routes_with_openapi())
        .merge(cart::routes_with_openapi())
        .merge(orders::routes_with_openapi())
        .merge(groups::routes_with_openapi())
}

/// The complete application: gateway routes plus the OpenAPI document at
/// `/api-docs/openapi.json`.
pub fn app(state: AppState) -> Router {
    let routes = routes_with_openapi();

    let mut openapi = routes.get_openapi().clone();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("LittleLemon API")
        .version("1.0.0")
        .build();
    if let Some(components) = openapi.components.as_mut() {
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }

    Router::new()
        .merge(routes)
        .route(
            "/api-docs/openapi.json",
            get(move || std::future::ready(Json(openapi.clone()))),
        )
        .with_state(state)
}
