use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::{
    app_error::AppError,
    models::{
        CreateOrderEntity, OrderEntity, OrderItemEntity, OrderStatus, UpdateOrderEntity,
    },
    permissions::{Operation, authorize},
    pricing::{ensure_storable_total, order_total},
    roles::{Identity, Role},
    services::cart::reprice,
    store::{AccountRepo, CartRepo, OrderQuery, OrderRepo, OrderScope},
};

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq)]
pub struct OrderDetails {
    pub order: OrderEntity,
    pub order_items: Vec<OrderItemEntity>,
}

/// Fields an order update may carry. `delivery_crew` is a username.
#[derive(Deserialize, ToSchema, Debug, Clone, Default)]
pub struct OrderPatch {
    pub delivery_crew: Option<String>,
    pub status: Option<OrderStatus>,
}

pub fn scope_for(identity: &Identity) -> OrderScope {
    match identity.role {
        Role::Manager => OrderScope::All,
        Role::DeliveryCrew => OrderScope::AssignedTo(identity.user_id),
        Role::Customer => OrderScope::PlacedBy(identity.user_id),
    }
}

fn can_view(identity: &Identity, order: &OrderEntity) -> bool {
    identity.is_manager()
        || order.user_id == identity.user_id
        || order.delivery_crew_id == Some(identity.user_id)
}

async fn with_items<R: OrderRepo>(
    repo: &mut R,
    order: OrderEntity,
) -> Result<OrderDetails, AppError> {
    let order_items = repo.order_items(&[order.id]).await?;
    Ok(OrderDetails { order, order_items })
}

async fn find_order<R: OrderRepo>(repo: &mut R, id: i32) -> Result<OrderEntity, AppError> {
    repo.find_order(id)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))
}

/// Turns the caller's cart into an order.
///
/// Creates the order, snapshots every cart line into an order item, and
/// removes the snapshotted lines from the cart. The steps are not atomic on
/// their own: run this inside a single transaction so a failure at any step
/// leaves neither a partial order nor a consumed cart. Lines added to the cart
/// after the snapshot was taken stay in the cart.
pub async fn place_order<R: CartRepo + OrderRepo>(
    repo: &mut R,
    identity: &Identity,
) -> Result<OrderDetails, AppError> {
    authorize(Operation::PlaceOrder, identity)?;

    let lines = reprice(repo.lock_cart_lines(identity.user_id).await?)?;
    if lines.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let mut seen = HashSet::new();
    if let Some(line) = lines.iter().find(|line| !seen.insert(line.menuitem_id)) {
        return Err(AppError::Conflict(format!(
            "Menu item #{} appears twice in the cart",
            line.menuitem_id
        )));
    }

    let total = order_total(lines.iter().map(|line| &line.line_price));
    ensure_storable_total(&total)?;
    let snapshotted: Vec<i32> = lines.iter().map(|line| line.menuitem_id).collect();

    let order = repo
        .insert_order(CreateOrderEntity {
            user_id: identity.user_id,
            delivery_crew_id: None,
            status: OrderStatus::OutForDelivery,
            total,
            created_at: Utc::now(),
        })
        .await?;

    let snapshot = lines
        .into_iter()
        .map(|line| OrderItemEntity {
            order_id: order.id,
            menuitem_id: line.menuitem_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_price: line.line_price,
        })
        .collect();
    let order_items = repo.insert_order_items(snapshot).await?;

    repo.remove_cart_lines(identity.user_id, &snapshotted).await?;

    info!(
        "Order #{} placed by {} with {} item(s), total {}",
        order.id,
        identity.username,
        order_items.len(),
        order.total
    );
    Ok(OrderDetails { order, order_items })
}

/// Orders visible to the caller: all for managers, assigned ones for
/// delivery crew, own orders for customers.
pub async fn list_orders<R: OrderRepo>(
    repo: &mut R,
    identity: &Identity,
    query: OrderQuery,
) -> Result<Vec<OrderDetails>, AppError> {
    authorize(Operation::ListOrders, identity)?;

    let orders = repo.list_orders(scope_for(identity), query).await?;
    let order_ids: Vec<i32> = orders.iter().map(|order| order.id).collect();
    let items = repo.order_items(&order_ids).await?;

    let mut group: HashMap<i32, Vec<OrderItemEntity>> = HashMap::new();
    for item in items {
        group.entry(item.order_id).or_default().push(item);
    }

    Ok(orders
        .into_iter()
        .map(|order| {
            let order_items = group.remove(&order.id).unwrap_or_default();
            OrderDetails { order, order_items }
        })
        .collect())
}

pub async fn get_order<R: OrderRepo>(
    repo: &mut R,
    identity: &Identity,
    id: i32,
) -> Result<OrderDetails, AppError> {
    authorize(Operation::ViewOrder, identity)?;

    let order = find_order(repo, id).await?;
    if !can_view(identity, &order) {
        return Err(AppError::Forbidden(
            "You do not have access to this order".into(),
        ));
    }
    with_items(repo, order).await
}

/// Managers may assign delivery crew and set status; the assigned delivery
/// crew may set status only.
pub async fn update_order<R: OrderRepo + AccountRepo>(
    repo: &mut R,
    identity: &Identity,
    id: i32,
    patch: OrderPatch,
) -> Result<OrderDetails, AppError> {
    let order = find_order(repo, id).await?;
    authorize(Operation::UpdateOrder, identity)?;

    let mut changes = UpdateOrderEntity::default();
    match identity.role {
        Role::Manager => {
            if let Some(username) = &patch.delivery_crew {
                let crew = repo.find_user_by_username(username).await?.ok_or_else(|| {
                    AppError::InvalidInput(format!("Delivery crew user {} not found", username))
                })?;
                changes.delivery_crew_id = Some(crew.id);
            }
        }
        Role::DeliveryCrew => {
            if patch.delivery_crew.is_some() || patch.status.is_none() {
                return Err(AppError::Forbidden("You can only update the status.".into()));
            }
            if order.delivery_crew_id != Some(identity.user_id) {
                return Err(AppError::Forbidden(
                    "This order is not assigned to you".into(),
                ));
            }
        }
        Role::Customer => {
            return Err(AppError::Forbidden("Unauthorized".into()));
        }
    }
    if let Some(status) = patch.status {
        changes.status = Some(order.status.transition_to(status)?);
    }

    if changes.is_empty() {
        return with_items(repo, order).await;
    }

    let updated = repo.update_order(id, changes.clone()).await?;
    if let Some(crew_id) = changes.delivery_crew_id {
        info!(
            "Order #{} assigned to delivery crew user #{} by {}",
            id, crew_id, identity.username
        );
    }
    if updated.status != order.status {
        info!(
            "Order #{} moved from {} to {} by {}",
            id,
            order.status.as_str(),
            updated.status.as_str(),
            identity.username
        );
    }
    with_items(repo, updated).await
}

/// Managers only. Order items go with the order.
pub async fn delete_order<R: OrderRepo>(
    repo: &mut R,
    identity: &Identity,
    id: i32,
) -> Result<(), AppError> {
    authorize(Operation::DeleteOrder, identity)?;
    find_order(repo, id).await?;

    if !repo.delete_order(id).await? {
        warn!("Order #{} vanished before it could be deleted", id);
        return Err(AppError::not_found("Order"));
    }
    info!("Order #{} deleted by {}", id, identity.username);
    Ok(())
}
