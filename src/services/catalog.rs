use bigdecimal::BigDecimal;
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    app_error::AppError,
    models::{
        CategoryEntity, CreateCategoryEntity, CreateMenuItemEntity, MenuItemEntity,
        UpdateMenuItemEntity,
    },
    permissions::{Operation, authorize},
    pricing::validate_price,
    roles::Identity,
    store::{CatalogRepo, MenuItemQuery},
};

#[derive(Deserialize, ToSchema, Debug, Clone)]
pub struct CategoryInput {
    /// Derived from the title when omitted.
    pub slug: Option<String>,
    pub title: String,
}

#[derive(Deserialize, ToSchema, Debug, Clone)]
pub struct MenuItemInput {
    pub title: String,
    #[schema(value_type = String, example = "9.99")]
    pub price: BigDecimal,
    #[serde(default)]
    pub featured: bool,
    pub category_id: i32,
}

#[derive(Deserialize, ToSchema, Debug, Clone, Default)]
pub struct MenuItemPatch {
    pub title: Option<String>,
    #[schema(value_type = Option<String>, example = "9.99")]
    pub price: Option<BigDecimal>,
    pub featured: Option<bool>,
    pub category_id: Option<i32>,
}

impl From<MenuItemInput> for MenuItemPatch {
    fn from(input: MenuItemInput) -> Self {
        Self {
            title: Some(input.title),
            price: Some(input.price),
            featured: Some(input.featured),
            category_id: Some(input.category_id),
        }
    }
}

/// Lowercases and joins alphanumeric runs with `-`.
pub fn slugify(title: &str) -> String {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

fn validate_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::InvalidInput("Title must not be empty".into()));
    }
    if title.chars().count() > 255 {
        return Err(AppError::InvalidInput(
            "Title must be at most 255 characters".into(),
        ));
    }
    Ok(title.to_string())
}

fn category_entity(input: CategoryInput) -> Result<CreateCategoryEntity, AppError> {
    let title = validate_title(&input.title)?;
    let slug = match input.slug {
        Some(slug) if !slug.trim().is_empty() => slug.trim().to_string(),
        _ => slugify(&title),
    };
    let valid = slug.len() <= 50
        && !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(AppError::InvalidInput(format!("Invalid slug: {}", slug)));
    }
    Ok(CreateCategoryEntity { slug, title })
}

async fn ensure_category_exists<R: CatalogRepo>(repo: &mut R, id: i32) -> Result<(), AppError> {
    match repo.find_category(id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::InvalidInput(format!(
            "Category with id {} does not exist",
            id
        ))),
    }
}

// Categories

pub async fn list_categories<R: CatalogRepo>(repo: &mut R) -> Result<Vec<CategoryEntity>, AppError> {
    repo.list_categories().await
}

pub async fn get_category<R: CatalogRepo>(repo: &mut R, id: i32) -> Result<CategoryEntity, AppError> {
    repo.find_category(id)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))
}

pub async fn create_category<R: CatalogRepo>(
    repo: &mut R,
    identity: &Identity,
    input: CategoryInput,
) -> Result<CategoryEntity, AppError> {
    authorize(Operation::CreateCatalogEntry, identity)?;
    let category = repo.insert_category(category_entity(input)?).await?;
    info!("Category #{} created by {}", category.id, identity.username);
    Ok(category)
}

pub async fn update_category<R: CatalogRepo>(
    repo: &mut R,
    identity: &Identity,
    id: i32,
    input: CategoryInput,
) -> Result<CategoryEntity, AppError> {
    authorize(Operation::UpdateCatalogEntry, identity)?;
    repo.update_category(id, category_entity(input)?)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))
}

/// Rejected with `Conflict` while any menu item references the category.
pub async fn delete_category<R: CatalogRepo>(
    repo: &mut R,
    identity: &Identity,
    id: i32,
) -> Result<(), AppError> {
    authorize(Operation::DeleteCatalogEntry, identity)?;
    get_category(repo, id).await?;

    let referencing = repo.count_menu_items_in_category(id).await?;
    if referencing > 0 {
        return Err(AppError::Conflict(format!(
            "Category #{} is used by {} menu item(s)",
            id, referencing
        )));
    }

    repo.delete_category(id).await?;
    info!("Category #{} deleted by {}", id, identity.username);
    Ok(())
}

// Menu items

pub async fn list_menu_items<R: CatalogRepo>(
    repo: &mut R,
    query: &MenuItemQuery,
) -> Result<Vec<MenuItemEntity>, AppError> {
    repo.list_menu_items(query).await
}

pub async fn get_menu_item<R: CatalogRepo>(repo: &mut R, id: i32) -> Result<MenuItemEntity, AppError> {
    repo.find_menu_item(id)
        .await?
        .ok_or_else(|| AppError::not_found("Menu item"))
}

pub async fn create_menu_item<R: CatalogRepo>(
    repo: &mut R,
    identity: &Identity,
    input: MenuItemInput,
) -> Result<MenuItemEntity, AppError> {
    authorize(Operation::CreateCatalogEntry, identity)?;

    let title = validate_title(&input.title)?;
    let price = validate_price(&input.price)?;
    ensure_category_exists(repo, input.category_id).await?;

    let item = repo
        .insert_menu_item(CreateMenuItemEntity {
            title,
            price,
            featured: input.featured,
            category_id: input.category_id,
        })
        .await?;
    info!("Menu item #{} created by {}", item.id, identity.username);
    Ok(item)
}

/// Applies the fields present in `patch`. Later cart writes pick up a new
/// price; placed orders keep theirs.
pub async fn update_menu_item<R: CatalogRepo>(
    repo: &mut R,
    identity: &Identity,
    id: i32,
    patch: MenuItemPatch,
) -> Result<MenuItemEntity, AppError> {
    authorize(Operation::UpdateCatalogEntry, identity)?;
    let current = get_menu_item(repo, id).await?;

    let changes = UpdateMenuItemEntity {
        title: patch.title.as_deref().map(validate_title).transpose()?,
        price: patch.price.as_ref().map(validate_price).transpose()?,
        featured: patch.featured,
        category_id: patch.category_id,
    };
    if let Some(category_id) = changes.category_id {
        ensure_category_exists(repo, category_id).await?;
    }
    if changes.is_empty() {
        return Ok(current);
    }

    let item = repo
        .update_menu_item(id, changes)
        .await?
        .ok_or_else(|| AppError::not_found("Menu item"))?;
    info!("Menu item #{} updated by {}", id, identity.username);
    Ok(item)
}

/// Rejected with `Conflict` while a placed order references the item; cart
/// lines referencing it are removed with it.
pub async fn delete_menu_item<R: CatalogRepo>(
    repo: &mut R,
    identity: &Identity,
    id: i32,
) -> Result<(), AppError> {
    authorize(Operation::DeleteCatalogEntry, identity)?;
    get_menu_item(repo, id).await?;

    if repo.count_order_items_for_menu_item(id).await? > 0 {
        return Err(AppError::Conflict(format!(
            "Menu item #{} is part of placed orders",
            id
        )));
    }

    repo.delete_menu_item(id).await?;
    info!("Menu item #{} deleted by {}", id, identity.username);
    Ok(())
}
