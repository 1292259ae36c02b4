use anyhow::Context;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use diesel_async::{AsyncConnection, AsyncPgConnection};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    extract::{Json, Path, Query},
    models::OrderStatus,
    roles::Identity,
    services::orders::{self, OrderDetails, OrderPatch},
    store::{OrderOrdering, OrderQuery},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_orders))
            .routes(utoipa_axum::routes!(place_order))
            .routes(utoipa_axum::routes!(get_order))
            .routes(utoipa_axum::routes!(update_order))
            .routes(utoipa_axum::routes!(delete_order)),
    )
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct OrderListParams {
    pub status: Option<OrderStatus>,
    /// Exact username of the customer who placed the order.
    #[serde(rename = "user__username")]
    pub username: Option<String>,
    /// Exact username of the assigned delivery crew.
    #[serde(rename = "delivery_crew__username")]
    pub delivery_crew: Option<String>,
    /// Matches the customer's or the delivery crew's username, case-insensitively.
    pub search: Option<String>,
    /// One of `user__username`, `-user__username`, `status`, `-status`.
    pub ordering: Option<String>,
}

impl OrderListParams {
    pub fn into_query(self) -> Result<OrderQuery, AppError> {
        let ordering = match self.ordering.as_deref() {
            None => OrderOrdering::Id,
            Some("user__username") => OrderOrdering::Username,
            Some("-user__username") => OrderOrdering::UsernameDesc,
            Some("status") => OrderOrdering::Status,
            Some("-status") => OrderOrdering::StatusDesc,
            Some(other) => {
                return Err(AppError::InvalidInput(format!(
                    "Cannot order orders by {}",
                    other
                )));
            }
        };
        Ok(OrderQuery {
            status: self.status,
            username: self.username,
            delivery_crew: self.delivery_crew,
            search: self.search.filter(|search| !search.trim().is_empty()),
            ordering,
        })
    }
}

/// List the orders visible to the caller.
///
/// Managers see every order, delivery crew the orders assigned to them and
/// customers their own orders.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(OrderListParams),
    responses(
        (status = 200, description = "List orders", body = StdResponse<Vec<OrderDetails>, String>)
    )
)]
async fn get_orders(
    State(state): State<AppState>,
    identity: Identity,
    Query(params): Query<OrderListParams>,
) -> Result<impl IntoResponse, AppError> {
    let query = params.into_query()?;
    let mut conn = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let orders = orders::list_orders(&mut *conn, &identity, query).await?;

    Ok(StdResponse {
        data: Some(orders),
        message: Some("Get orders successfully"),
    })
}

/// Place an order from the caller's cart.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    responses(
        (status = 201, description = "Placed order successfully", body = StdResponse<OrderDetails, String>),
        (status = 400, description = "Cart is empty")
    )
)]
async fn place_order(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;
    let conn: &mut AsyncPgConnection = &mut conn;

    let order = conn
        .transaction(move |conn| {
            Box::pin(async move { orders::place_order(conn, &identity).await })
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(order),
            message: Some("Placed order successfully"),
        },
    ))
}

/// Fetch a specific order with its items.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to fetch")
    ),
    responses(
        (status = 200, description = "Get order successfully", body = StdResponse<OrderDetails, String>),
        (status = 403, description = "Order belongs to someone else"),
        (status = 404, description = "Order not found")
    )
)]
async fn get_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order = orders::get_order(&mut *conn, &identity, id).await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Get order successfully"),
    })
}

/// Assign delivery crew (managers) or set the status (managers and the
/// assigned delivery crew).
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to update")
    ),
    request_body = OrderPatch,
    responses(
        (status = 200, description = "Updated order successfully", body = StdResponse<OrderDetails, String>),
        (status = 403, description = "Caller may not make this change")
    )
)]
async fn update_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<OrderPatch>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;
    let conn: &mut AsyncPgConnection = &mut conn;

    let order = conn
        .transaction(move |conn| {
            Box::pin(async move { orders::update_order(conn, &identity, id, body).await })
        })
        .await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Updated order successfully"),
    })
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to delete")
    ),
    responses(
        (status = 204, description = "Deleted order successfully"),
        (status = 403, description = "Caller is not a manager"),
        (status = 404, description = "Order not found")
    )
)]
async fn delete_order(
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
        Box::pin(async move { orders::delete_order(conn, &identity, id).await })
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
