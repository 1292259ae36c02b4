//! Price arithmetic shared by the cart and order engines.
//!
//! Every write path that stores a price goes through [`compute_line_price`];
//! caller-supplied prices are never trusted.

use bigdecimal::{BigDecimal, Zero};

use crate::{app_error::AppError, models::MenuItemEntity};

/// Prices are stored as `NUMERIC(6, 2)`.
const PRICE_SCALE: i64 = 2;
const PRICE_CEILING: i64 = 10_000;
/// Line prices and order totals are stored as `NUMERIC(12, 2)`.
const AMOUNT_CEILING: i64 = 10_000_000_000;

/// Largest quantity a single cart line may hold.
pub const MAX_QUANTITY: i32 = 1_000;

pub fn validate_quantity(quantity: i32) -> Result<i32, AppError> {
    if quantity <= 0 {
        return Err(AppError::InvalidInput(
            "Quantity must be a positive integer".into(),
        ));
    }
    if quantity > MAX_QUANTITY {
        return Err(AppError::InvalidInput(format!(
            "Quantity may not exceed {}",
            MAX_QUANTITY
        )));
    }
    Ok(quantity)
}

/// Returns `(unit_price, line_price)` for `quantity` units of `menu_item` at
/// its current price.
pub fn compute_line_price(
    menu_item: &MenuItemEntity,
    quantity: i32,
) -> Result<(BigDecimal, BigDecimal), AppError> {
    let quantity = validate_quantity(quantity)?;
    let unit_price = menu_item.price.with_scale(PRICE_SCALE);
    let line_price = (&unit_price * BigDecimal::from(quantity)).with_scale(PRICE_SCALE);
    Ok((unit_price, line_price))
}

/// Sums line prices into an order total.
pub fn order_total<'a>(line_prices: impl IntoIterator<Item = &'a BigDecimal>) -> BigDecimal {
    line_prices
        .into_iter()
        .fold(BigDecimal::zero(), |acc, price| acc + price)
        .with_scale(PRICE_SCALE)
}

/// Rejects an order total too large to be stored.
pub fn ensure_storable_total(total: &BigDecimal) -> Result<(), AppError> {
    if *total >= BigDecimal::from(AMOUNT_CEILING) {
        return Err(AppError::InvalidInput(format!(
            "Order total {} exceeds the maximum order value",
            total
        )));
    }
    Ok(())
}

/// Validates a menu price: positive, at most two fraction digits, and within
/// the storage precision. Returns the price normalised to two digits.
pub fn validate_price(price: &BigDecimal) -> Result<BigDecimal, AppError> {
    if *price <= BigDecimal::zero() {
        return Err(AppError::InvalidInput("Price must be positive".into()));
    }
    let normalised = price.with_scale(PRICE_SCALE);
    if normalised != *price {
        return Err(AppError::InvalidInput(
            "Price may have at most two decimal places".into(),
        ));
    }
    if normalised >= BigDecimal::from(PRICE_CEILING) {
        return Err(AppError::InvalidInput(format!(
            "Price must be below {}",
            PRICE_CEILING
        )));
    }
    Ok(normalised)
}
