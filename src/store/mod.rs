//! Repository interfaces the services run against.
//!
//! Implementations do not open transactions themselves: the caller wraps each
//! mutating operation in one unit of work (`AsyncConnection::transaction` for
//! PostgreSQL) so a failure at any step rolls back every earlier step.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::{
    app_error::AppError,
    models::{
        CartLineEntity, CategoryEntity, CreateCategoryEntity, CreateMenuItemEntity,
        CreateOrderEntity, GroupEntity, MenuItemEntity, OrderEntity, OrderItemEntity,
        OrderStatus, UpdateMenuItemEntity, UpdateOrderEntity, UserEntity,
    },
};

#[cfg(test)]
pub mod memory;
pub mod postgres;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MenuItemOrdering {
    #[default]
    Id,
    Title,
    TitleDesc,
    Price,
    PriceDesc,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuItemQuery {
    /// Case-insensitive match on the item title or its category title.
    pub search: Option<String>,
    pub title: Option<String>,
    pub price: Option<BigDecimal>,
    pub ordering: MenuItemOrdering,
}

/// Which orders a caller may see, derived from its role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    All,
    AssignedTo(i32),
    PlacedBy(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderOrdering {
    #[default]
    Id,
    Username,
    UsernameDesc,
    Status,
    StatusDesc,
}

/// Filters applied within an [`OrderScope`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    /// Exact username of the customer who placed the order.
    pub username: Option<String>,
    /// Exact username of the assigned delivery crew.
    pub delivery_crew: Option<String>,
    /// Case-insensitive match on either of the two usernames.
    pub search: Option<String>,
    pub ordering: OrderOrdering,
}

#[async_trait]
pub trait CatalogRepo: Send {
    async fn list_categories(&mut self) -> Result<Vec<CategoryEntity>, AppError>;
    async fn find_category(&mut self, id: i32) -> Result<Option<CategoryEntity>, AppError>;
    async fn insert_category(
        &mut self,
        category: CreateCategoryEntity,
    ) -> Result<CategoryEntity, AppError>;
    async fn update_category(
        &mut self,
        id: i32,
        category: CreateCategoryEntity,
    ) -> Result<Option<CategoryEntity>, AppError>;
    async fn count_menu_items_in_category(&mut self, id: i32) -> Result<i64, AppError>;
    async fn delete_category(&mut self, id: i32) -> Result<bool, AppError>;

    async fn list_menu_items(
        &mut self,
        query: &MenuItemQuery,
    ) -> Result<Vec<MenuItemEntity>, AppError>;
    async fn find_menu_item(&mut self, id: i32) -> Result<Option<MenuItemEntity>, AppError>;
    async fn insert_menu_item(
        &mut self,
        item: CreateMenuItemEntity,
    ) -> Result<MenuItemEntity, AppError>;
    async fn update_menu_item(
        &mut self,
        id: i32,
        changes: UpdateMenuItemEntity,
    ) -> Result<Option<MenuItemEntity>, AppError>;
    async fn count_order_items_for_menu_item(&mut self, id: i32) -> Result<i64, AppError>;
    async fn delete_menu_item(&mut self, id: i32) -> Result<bool, AppError>;
}

#[async_trait]
pub trait CartRepo: Send {
    /// Cart lines of `user_id` paired with the menu item each references.
    async fn cart_lines(
        &mut self,
        user_id: i32,
    ) -> Result<Vec<(CartLineEntity, MenuItemEntity)>, AppError>;
    /// Inserts the line or overwrites the existing one for the same
    /// `(user_id, menuitem_id)`.
    /// Same as [`CartRepo::cart_lines`], but the rows stay locked against
    /// concurrent writers until the surrounding transaction ends.
    async fn lock_cart_lines(
        &mut self,
        user_id: i32,
    ) -> Result<Vec<(CartLineEntity, MenuItemEntity)>, AppError>;
    async fn save_cart_line(&mut self, line: CartLineEntity) -> Result<CartLineEntity, AppError>;
    async fn clear_cart(&mut self, user_id: i32) -> Result<usize, AppError>;
    /// Removes only the given lines of `user_id`'s cart.
    async fn remove_cart_lines(
        &mut self,
        user_id: i32,
        menuitem_ids: &[i32],
    ) -> Result<usize, AppError>;
}

#[async_trait]
pub trait OrderRepo: Send {
    async fn insert_order(&mut self, order: CreateOrderEntity) -> Result<OrderEntity, AppError>;
    async fn insert_order_items(
        &mut self,
        items: Vec<OrderItemEntity>,
    ) -> Result<Vec<OrderItemEntity>, AppError>;
    async fn list_orders(
        &mut self,
        scope: OrderScope,
        query: OrderQuery,
    ) -> Result<Vec<OrderEntity>, AppError>;
    async fn find_order(&mut self, id: i32) -> Result<Option<OrderEntity>, AppError>;
    async fn order_items(&mut self, order_ids: &[i32]) -> Result<Vec<OrderItemEntity>, AppError>;
    async fn update_order(
        &mut self,
        id: i32,
        changes: UpdateOrderEntity,
    ) -> Result<OrderEntity, AppError>;
    /// Deletes the order and, by cascade, its items.
    async fn delete_order(&mut self, id: i32) -> Result<bool, AppError>;
}

#[async_trait]
pub trait AccountRepo: Send {
    async fn find_user(&mut self, id: i32) -> Result<Option<UserEntity>, AppError>;
    async fn find_user_by_username(
        &mut self,
        username: &str,
    ) -> Result<Option<UserEntity>, AppError>;
    async fn find_user_by_token(&mut self, token: Uuid) -> Result<Option<UserEntity>, AppError>;
    async fn group_names_of(&mut self, user_id: i32) -> Result<Vec<String>, AppError>;
    async fn find_group(&mut self, name: &str) -> Result<Option<GroupEntity>, AppError>;
    /// Returns the named group, creating it when absent.
    async fn ensure_group(&mut self, name: &str) -> Result<GroupEntity, AppError>;
    async fn group_members(&mut self, group_id: i32) -> Result<Vec<UserEntity>, AppError>;
    /// Idempotent.
    async fn add_membership(&mut self, user_id: i32, group_id: i32) -> Result<(), AppError>;
    async fn remove_membership(&mut self, user_id: i32, group_id: i32) -> Result<bool, AppError>;
}
