use anyhow::Context;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use bigdecimal::BigDecimal;
use diesel_async::{AsyncConnection, AsyncPgConnection};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    extract::{Json, Path, Query},
    models::MenuItemEntity,
    roles::Identity,
    services::catalog::{self, MenuItemInput, MenuItemPatch},
    store::{MenuItemOrdering, MenuItemQuery},
    throttle::Throttle,
};

/// Menu item routes. Reads are public; writes require a Manager.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/menu-items",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_menu_items))
            .routes(utoipa_axum::routes!(create_menu_item))
            .routes(utoipa_axum::routes!(get_menu_item))
            .routes(utoipa_axum::routes!(replace_menu_item))
            .routes(utoipa_axum::routes!(update_menu_item))
            .routes(utoipa_axum::routes!(delete_menu_item)),
    )
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct MenuItemListParams {
    /// Matches item or category titles, case-insensitively.
    pub search: Option<String>,
    /// Exact item title.
    pub title: Option<String>,
    /// Exact item price, e.g. `5.50`.
    #[param(value_type = Option<String>)]
    pub price: Option<BigDecimal>,
    /// One of `title`, `-title`, `price`, `-price`.
    pub ordering: Option<String>,
}

impl MenuItemListParams {
    pub fn into_query(self) -> Result<MenuItemQuery, AppError> {
        let ordering = match self.ordering.as_deref() {
            None => MenuItemOrdering::Id,
            Some("title") => MenuItemOrdering::Title,
            Some("-title") => MenuItemOrdering::TitleDesc,
            Some("price") => MenuItemOrdering::Price,
            Some("-price") => MenuItemOrdering::PriceDesc,
            Some(other) => {
                return Err(AppError::InvalidInput(format!(
                    "Cannot order menu items by {}",
                    other
                )));
            }
        };
        Ok(MenuItemQuery {
            search: self.search.filter(|search| !search.trim().is_empty()),
            title: self.title,
            price: self.price,
            ordering,
        })
    }
}

/// List menu items.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Menu items"],
    params(MenuItemListParams),
    responses(
        (status = 200, description = "List menu items", body = StdResponse<Vec<MenuItemEntity>, String>),
        (status = 429, description = "Too many requests")
    )
)]
async fn get_menu_items(
    _throttle: Throttle,
    State(state): State<AppState>,
    Query(params): Query<MenuItemListParams>,
) -> Result<impl IntoResponse, AppError> {
    let query = params.into_query()?;
    let mut conn = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let items = catalog::list_menu_items(&mut *conn, &query).await?;

    Ok(StdResponse {
        data: Some(items),
        message: Some("Get menu items successfully"),
    })
}

/// Fetch a single menu item.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Menu items"],
    params(
        ("id" = i32, Path, description = "Menu item ID to fetch")
    ),
    responses(
        (status = 200, description = "Get menu item successfully", body = StdResponse<MenuItemEntity, String>),
        (status = 404, description = "Menu item not found"),
        (status = 429, description = "Too many requests")
    )
)]
async fn get_menu_item(
    _throttle: Throttle,
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let item = catalog::get_menu_item(&mut *conn, id).await?;

    Ok(StdResponse {
        data: Some(item),
        message: Some("Get menu item successfully"),
    })
}

/// Create a menu item.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Menu items"],
    security(("bearerAuth" = [])),
    request_body = MenuItemInput,
    responses(
        (status = 201, description = "Created menu item successfully", body = StdResponse<MenuItemEntity, String>),
        (status = 403, description = "Caller is not a manager")
    )
)]
async fn create_menu_item(
    _throttle: Throttle,
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<MenuItemInput>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;
    let conn: &mut AsyncPgConnection = &mut conn;

    let item = conn
        .transaction(move |conn| {
            Box::pin(async move { catalog::create_menu_item(conn, &identity, body).await })
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(item),
            message: Some("Created menu item successfully"),
        },
    ))
}

/// Replace every field of a menu item.
#[utoipa::path(
    put,
    path = "/{id}",
    tags = ["Menu items"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Menu item ID to replace")
    ),
    request_body = MenuItemInput,
    responses(
        (status = 200, description = "Updated menu item successfully", body = StdResponse<MenuItemEntity, String>)
    )
)]
async fn replace_menu_item(
    _throttle: Throttle,
    Path(id): Path<i32>,
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<MenuItemInput>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;
    let conn: &mut AsyncPgConnection = &mut conn;

    let item = conn
        .transaction(move |conn| {
            Box::pin(async move {
                catalog::update_menu_item(conn, &identity, id, MenuItemPatch::from(body)).await
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(item),
        message: Some("Updated menu item successfully"),
    })
}

/// Update some fields of a menu item.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Menu items"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Menu item ID to update")
    ),
    request_body = MenuItemPatch,
    responses(
        (status = 200, description = "Updated menu item successfully", body = StdResponse<MenuItemEntity, String>)
    )
)]
async fn update_menu_item(
    _throttle: Throttle,
    Path(id): Path<i32>,
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<MenuItemPatch>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;
    let conn: &mut AsyncPgConnection = &mut conn;

    let item = conn
        .transaction(move |conn| {
            Box::pin(async move { catalog::update_menu_item(conn, &identity, id, body).await })
        })
        .await?;

    Ok(StdResponse {
        data: Some(item),
        message: Some("Updated menu item successfully"),
    })
}

/// Delete a menu item that no placed order references.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Menu items"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Menu item ID to delete")
    ),
    responses(
        (status = 204, description = "Deleted menu item successfully"),
        (status = 409, description = "Menu item is part of placed orders")
    )
)]
async fn delete_menu_item(
    _throttle: Throttle,
    Path(id): Path<i32>,
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;
    let conn: &mut AsyncPgConnection = &mut conn;

    conn.transaction(move |conn| {
        Box::pin(async move { catalog::delete_menu_item(conn, &identity, id).await })
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_parameter_is_parsed() {
        let query = MenuItemListParams {
            ordering: Some("-price".into()),
            search: Some("   ".into()),
            ..Default::default()
        }
        .into_query()
        .unwrap();
        assert_eq!(query.ordering, MenuItemOrdering::PriceDesc);
        assert_eq!(query.search, None);

        let query = MenuItemListParams {
            title: Some("Greek Salad".into()),
            price: Some(BigDecimal::from(10)),
            ..Default::default()
        }
        .into_query()
        .unwrap();
        assert_eq!(query.title.as_deref(), Some("Greek Salad"));
        assert_eq!(query.price, Some(BigDecimal::from(10)));

        let err = MenuItemListParams {
            ordering: Some("calories".into()),
            ..Default::default()
        }
        .into_query()
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
