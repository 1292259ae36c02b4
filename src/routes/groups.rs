use anyhow::Context;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use diesel_async::{AsyncConnection, AsyncPgConnection};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    extract::{Json, Path},
    roles::{Identity, StaffGroup},
    services::groups,
};

/// Membership routes for both staff groups. The Manager group is managed by
/// admins, the Delivery Crew group by managers.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new()
        .nest(
            "/groups/manager/users",
            OpenApiRouter::new()
                .routes(utoipa_axum::routes!(get_managers))
                .routes(utoipa_axum::routes!(add_manager))
                .routes(utoipa_axum::routes!(remove_manager)),
        )
        .nest(
            "/groups/delivery-crew/users",
            OpenApiRouter::new()
                .routes(utoipa_axum::routes!(get_delivery_crew))
                .routes(utoipa_axum::routes!(add_delivery_crew))
                .routes(utoipa_axum::routes!(remove_delivery_crew)),
        )
}

#[derive(Deserialize, ToSchema, Debug)]
struct AddMemberReq {
    pub username: Option<String>,
}

async fn list_members(
    state: AppState,
    identity: Identity,
    group: StaffGroup,
) -> Result<StdResponse<Vec<String>, &'static str>, AppError> {
    let mut conn = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let members = groups::list_group_members(&mut *conn, &identity, group).await?;

    Ok(StdResponse {
        data: Some(members.into_iter().map(|user| user.username).collect()),
        message: Some("Get group members successfully"),
    })
}

async fn add_member(
    state: AppState,
    identity: Identity,
    group: StaffGroup,
    body: AddMemberReq,
) -> Result<(StatusCode, StdResponse<String, String>), AppError> {
    let mut conn = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;
    let conn: &mut AsyncPgConnection = &mut conn;

    let username = body.username.unwrap_or_default();
    let added = conn
        .transaction(move |conn| {
            Box::pin(
                async move { groups::assign_to_group(conn, &identity, group, &username).await },
            )
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        StdResponse {
            message: Some(format!(
                "User {} added to {} group.",
                added.username,
                group.name()
            )),
            data: Some(added.username),
        },
    ))
}

async fn remove_member(
    state: AppState,
    identity: Identity,
    group: StaffGroup,
    username: String,
) -> Result<StatusCode, AppError> {
    let mut conn = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;
    let conn: &mut AsyncPgConnection = &mut conn;

    conn.transaction(move |conn| {
        Box::pin(
            async move { groups::revoke_from_group(conn, &identity, group, &username).await },
        )
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

// Manager group

/// List usernames in the Manager group.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Groups"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get group members successfully", body = StdResponse<Vec<String>, String>),
        (status = 403, description = "Caller is not an admin")
    )
)]
async fn get_managers(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, AppError> {
    list_members(state, identity, StaffGroup::Manager).await
}

#[utoipa::path(
    post,
    path = "/",
    tags = ["Groups"],
    security(("bearerAuth" = [])),
    request_body = AddMemberReq,
    responses(
        (status = 201, description = "Added user to group successfully", body = StdResponse<String, String>),
        (status = 404, description = "User not found")
    )
)]
async fn add_manager(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<AddMemberReq>,
) -> Result<impl IntoResponse, AppError> {
    add_member(state, identity, StaffGroup::Manager, body).await
}

#[utoipa::path(
    delete,
    path = "/{username}",
    tags = ["Groups"],
    security(("bearerAuth" = [])),
    params(
        ("username" = String, Path, description = "User to remove from the group")
    ),
    responses(
        (status = 204, description = "Removed user from group successfully"),
        (status = 404, description = "User or group not found")
    )
)]
async fn remove_manager(
    Path(username): Path<String>,
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, AppError> {
    remove_member(state, identity, StaffGroup::Manager, username).await
}

// Delivery Crew group

/// List usernames in the Delivery Crew group.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Groups"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get group members successfully", body = StdResponse<Vec<String>, String>),
        (status = 403, description = "Caller is not a manager")
    )
)]
async fn get_delivery_crew(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, AppError> {
    list_members(state, identity, StaffGroup::DeliveryCrew).await
}

#[utoipa::path(
    post,
    path = "/",
    tags = ["Groups"],
    security(("bearerAuth" = [])),
    request_body = AddMemberReq,
    responses(
        (status = 201, description = "Added user to group successfully", body = StdResponse<String, String>),
        (status = 404, description = "User not found")
    )
)]
async fn add_delivery_crew(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<AddMemberReq>,
) -> Result<impl IntoResponse, AppError> {
    add_member(state, identity, StaffGroup::DeliveryCrew, body).await
}

#[utoipa::path(
    delete,
    path = "/{username}",
    tags = ["Groups"],
    security(("bearerAuth" = [])),
    params(
        ("username" = String, Path, description = "User to remove from the group")
    ),
    responses(
        (status = 204, description = "Removed user from group successfully"),
        (status = 404, description = "User or group not found")
    )
)]
async fn remove_delivery_crew(
    Path(username): Path<String>,
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, AppError> {
    remove_member(state, identity, StaffGroup::DeliveryCrew, username).await
}
