use anyhow::Context;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use bigdecimal::BigDecimal;
use diesel_async::{AsyncConnection, AsyncPgConnection};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    extract::Json,
    models::CartLineEntity,
    roles::Identity,
    services::cart,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/cart",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_cart))
            .routes(utoipa_axum::routes!(upsert_cart_line))
            .routes(utoipa_axum::routes!(clear_cart)),
    )
}

#[derive(Serialize, ToSchema)]
struct GetCartRes {
    pub cart_items: Vec<CartLineEntity>,
    #[schema(value_type = String)]
    pub total_price: BigDecimal,
}

/// Fetch the caller's cart.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Cart"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get cart successfully", body = StdResponse<GetCartRes, String>),
        (status = 401, description = "Missing or unknown token")
    )
)]
async fn get_cart(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let cart_items = cart::list_cart(&mut *conn, &identity).await?;
    let total_price = cart::cart_total(&cart_items);

    Ok(StdResponse {
        data: Some(GetCartRes {
            cart_items,
            total_price,
        }),
        message: Some("Get cart successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpsertCartLineReq {
    /// Menu item ID.
    pub menuitem: i32,
    /// Defaults to 1.
    #[serde(default = "one")]
    #[schema(default = 1)]
    pub quantity: i32,
}

fn one() -> i32 {
    1
}

/// Add a menu item to the cart, or overwrite its quantity.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Cart"],
    security(("bearerAuth" = [])),
    request_body = UpsertCartLineReq,
    responses(
        (status = 201, description = "Saved cart line successfully", body = StdResponse<CartLineEntity, String>),
        (status = 400, description = "Quantity is not positive"),
        (status = 404, description = "Menu item not found")
    )
)]
async fn upsert_cart_line(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<UpsertCartLineReq>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;
    let conn: &mut AsyncPgConnection = &mut conn;

    let line = conn
        .transaction(move |conn| {
            Box::pin(async move {
                cart::upsert_line(conn, &identity, body.menuitem, body.quantity).await
            })
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(line),
            message: Some("Saved cart line successfully"),
        },
    ))
}

/// Empty the caller's cart.
#[utoipa::path(
    delete,
    path = "/",
    tags = ["Cart"],
    security(("bearerAuth" = [])),
    responses(
        (status = 204, description = "Cleared cart successfully")
    )
)]
async fn clear_cart(
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
        Box::pin(async move { cart::clear_cart(conn, &identity).await })
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_defaults_to_one() {
        let line: UpsertCartLineReq = serde_json::from_str(r#"{"menuitem":7}"#).unwrap();
        assert_eq!(line.menuitem, 7);
        assert_eq!(line.quantity, 1);

        let line: UpsertCartLineReq =
            serde_json::from_str(r#"{"menuitem":7,"quantity":4}"#).unwrap();
        assert_eq!(line.quantity, 4);
    }
}
