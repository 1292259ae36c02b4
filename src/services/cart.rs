use bigdecimal::BigDecimal;
use tracing::{debug, info};

use crate::{
    app_error::AppError,
    models::{CartLineEntity, MenuItemEntity},
    permissions::{Operation, authorize},
    pricing::{compute_line_price, order_total, validate_quantity},
    roles::Identity,
    store::{CartRepo, CatalogRepo},
};

/// Builds a cart line priced from the menu item as it is now.
pub fn priced_line(
    user_id: i32,
    menu_item: &MenuItemEntity,
    quantity: i32,
) -> Result<CartLineEntity, AppError> {
    let (unit_price, line_price) = compute_line_price(menu_item, quantity)?;
    Ok(CartLineEntity {
        user_id,
        menuitem_id: menu_item.id,
        quantity,
        unit_price,
        line_price,
    })
}

/// Re-prices stored lines against the menu items they were loaded with.
pub fn reprice(
    rows: Vec<(CartLineEntity, MenuItemEntity)>,
) -> Result<Vec<CartLineEntity>, AppError> {
    rows.into_iter()
        .map(|(line, menu_item)| priced_line(line.user_id, &menu_item, line.quantity))
        .collect()
}

/// Cart lines of the caller, re-priced against current menu prices.
pub async fn list_cart<R: CartRepo>(
    repo: &mut R,
    identity: &Identity,
) -> Result<Vec<CartLineEntity>, AppError> {
    authorize(Operation::ViewCart, identity)?;
    reprice(repo.cart_lines(identity.user_id).await?)
}

pub fn cart_total(lines: &[CartLineEntity]) -> BigDecimal {
    order_total(lines.iter().map(|line| &line.line_price))
}

/// Sets the quantity of `menuitem_id` in the caller's cart. A second call for
/// the same item overwrites the quantity instead of adding to it.
pub async fn upsert_line<R: CartRepo + CatalogRepo>(
    repo: &mut R,
    identity: &Identity,
    menuitem_id: i32,
    quantity: i32,
) -> Result<CartLineEntity, AppError> {
    authorize(Operation::ModifyCart, identity)?;
    validate_quantity(quantity)?;

    let menu_item = repo
        .find_menu_item(menuitem_id)
        .await?
        .ok_or_else(|| AppError::not_found("Menu item"))?;

    let line = repo
        .save_cart_line(priced_line(identity.user_id, &menu_item, quantity)?)
        .await?;
    debug!(
        "Cart of {}: {} x menu item #{} at {}",
        identity.username, line.quantity, line.menuitem_id, line.unit_price
    );
    Ok(line)
}

/// Empties the caller's cart. Clearing an empty cart is not an error.
pub async fn clear_cart<R: CartRepo>(repo: &mut R, identity: &Identity) -> Result<usize, AppError> {
    authorize(Operation::ClearCart, identity)?;
    let removed = repo.clear_cart(identity.user_id).await?;
    info!("Cleared {} cart line(s) for {}", removed, identity.username);
    Ok(removed)
}
