use anyhow::Context;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use diesel_async::{AsyncConnection, AsyncPgConnection};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    extract::{Json, Path},
    models::CategoryEntity,
    roles::Identity,
    services::catalog::{self, CategoryInput},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/categories",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_categories))
            .routes(utoipa_axum::routes!(create_category))
            .routes(utoipa_axum::routes!(get_category))
            .routes(utoipa_axum::routes!(update_category))
            .routes(utoipa_axum::routes!(delete_category)),
    )
}

/// List categories.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Categories"],
    responses(
        (status = 200, description = "List categories", body = StdResponse<Vec<CategoryEntity>, String>)
    )
)]
async fn get_categories(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let mut conn = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let categories = catalog::list_categories(&mut *conn).await?;

    Ok(StdResponse {
        data: Some(categories),
        message: Some("Get categories successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Categories"],
    params(
        ("id" = i32, Path, description = "Category ID to fetch")
    ),
    responses(
        (status = 200, description = "Get category successfully", body = StdResponse<CategoryEntity, String>),
        (status = 404, description = "Category not found")
    )
)]
async fn get_category(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let category = catalog::get_category(&mut *conn, id).await?;

    Ok(StdResponse {
        data: Some(category),
        message: Some("Get category successfully"),
    })
}

/// Create a category. The slug is derived from the title when omitted.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Categories"],
    security(("bearerAuth" = [])),
    request_body = CategoryInput,
    responses(
        (status = 201, description = "Created category successfully", body = StdResponse<CategoryEntity, String>),
        (status = 409, description = "Slug already taken")
    )
)]
async fn create_category(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<CategoryInput>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;
    let conn: &mut AsyncPgConnection = &mut conn;

    let category = conn
        .transaction(move |conn| {
            Box::pin(async move { catalog::create_category(conn, &identity, body).await })
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(category),
            message: Some("Created category successfully"),
        },
    ))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tags = ["Categories"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Category ID to update")
    ),
    request_body = CategoryInput,
    responses(
        (status = 200, description = "Updated category successfully", body = StdResponse<CategoryEntity, String>)
    )
)]
async fn update_category(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<CategoryInput>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;
    let conn: &mut AsyncPgConnection = &mut conn;

    let category = conn
        .transaction(move |conn| {
            Box::pin(async move { catalog::update_category(conn, &identity, id, body).await })
        })
        .await?;

    Ok(StdResponse {
        data: Some(category),
        message: Some("Updated category successfully"),
    })
}

/// Delete a category no menu item belongs to.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Categories"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Category ID to delete")
    ),
    responses(
        (status = 204, description = "Deleted category successfully"),
        (status = 409, description = "Category still has menu items")
    )
)]
async fn delete_category(
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
        Box::pin(async move { catalog::delete_category(conn, &identity, id).await })
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
