use tracing::info;
use uuid::Uuid;

use crate::{
    app_error::AppError,
    models::UserEntity,
    permissions::{Operation, authorize},
    roles::{Identity, Role, StaffGroup},
    store::AccountRepo,
};

/// Classifies `user` by its group memberships.
pub async fn identify<R: AccountRepo>(repo: &mut R, user: &UserEntity) -> Result<Identity, AppError> {
    let group_names = repo.group_names_of(user.id).await?;
    let role = Role::from_groups(group_names.iter().map(String::as_str));
    Ok(Identity::new(user, role))
}

/// Resolves an issued token into the identity it was issued to.
pub async fn authenticate<R: AccountRepo>(repo: &mut R, token: Uuid) -> Result<Identity, AppError> {
    let user = repo
        .find_user_by_token(token)
        .await?
        .ok_or(AppError::Unauthorized)?;
    identify(repo, &user).await
}

async fn is_member<R: AccountRepo>(
    repo: &mut R,
    user_id: i32,
    group: StaffGroup,
) -> Result<bool, AppError> {
    let group_names = repo.group_names_of(user_id).await?;
    Ok(group_names.iter().any(|name| name == group.name()))
}

pub async fn is_manager<R: AccountRepo>(repo: &mut R, user_id: i32) -> Result<bool, AppError> {
    is_member(repo, user_id, StaffGroup::Manager).await
}

pub async fn is_delivery_crew<R: AccountRepo>(repo: &mut R, user_id: i32) -> Result<bool, AppError> {
    is_member(repo, user_id, StaffGroup::DeliveryCrew).await
}

fn group_missing(group: StaffGroup) -> AppError {
    AppError::NotFound(format!("{} group does not exist", group.name()))
}

async fn find_user<R: AccountRepo>(repo: &mut R, username: &str) -> Result<UserEntity, AppError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::InvalidInput("Username is required".into()));
    }
    repo.find_user_by_username(username)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
}

pub async fn list_group_members<R: AccountRepo>(
    repo: &mut R,
    actor: &Identity,
    group: StaffGroup,
) -> Result<Vec<UserEntity>, AppError> {
    authorize(Operation::ListGroupMembers(group), actor)?;
    let found = repo
        .find_group(group.name())
        .await?
        .ok_or_else(|| group_missing(group))?;
    repo.group_members(found.id).await
}

/// Adds `username` to `group`, creating the group on first use.
pub async fn assign_to_group<R: AccountRepo>(
    repo: &mut R,
    actor: &Identity,
    group: StaffGroup,
    username: &str,
) -> Result<UserEntity, AppError> {
    authorize(Operation::AssignGroupMember(group), actor)?;
    let user = find_user(repo, username).await?;

    let found = repo.ensure_group(group.name()).await?;
    repo.add_membership(user.id, found.id).await?;

    info!(
        "User {} added to {} group by {}",
        user.username,
        group.name(),
        actor.username
    );
    Ok(user)
}

pub async fn revoke_from_group<R: AccountRepo>(
    repo: &mut R,
    actor: &Identity,
    group: StaffGroup,
    username: &str,
) -> Result<UserEntity, AppError> {
    authorize(Operation::RevokeGroupMember(group), actor)?;
    let user = find_user(repo, username).await?;
    let found = repo
        .find_group(group.name())
        .await?
        .ok_or_else(|| group_missing(group))?;

    if repo.remove_membership(user.id, found.id).await? {
        info!(
            "User {} removed from {} group by {}",
            user.username,
            group.name(),
            actor.username
        );
    }
    Ok(user)
}
