//! In-memory repository for service tests. Mirrors the foreign-key rules of
//! the PostgreSQL schema and supports snapshot/rollback transactions.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::str::FromStr;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::{
    app_error::AppError,
    models::{
        CartLineEntity, CategoryEntity, CreateCategoryEntity, CreateMenuItemEntity,
        CreateOrderEntity, GroupEntity, MenuItemEntity, OrderEntity, OrderItemEntity,
        UpdateMenuItemEntity, UpdateOrderEntity, UserEntity,
    },
    roles::StaffGroup,
    store::{
        AccountRepo, CartRepo, CatalogRepo, MenuItemOrdering, MenuItemQuery, OrderOrdering,
        OrderQuery, OrderRepo, OrderScope,
    },
};

#[derive(Clone, Default)]
pub struct MemoryStore {
    next_id: i32,
    users: BTreeMap<i32, UserEntity>,
    tokens: HashMap<Uuid, i32>,
    groups: BTreeMap<i32, GroupEntity>,
    memberships: BTreeSet<(i32, i32)>,
    categories: BTreeMap<i32, CategoryEntity>,
    menu_items: BTreeMap<i32, MenuItemEntity>,
    cart_lines: BTreeMap<(i32, i32), CartLineEntity>,
    orders: BTreeMap<i32, OrderEntity>,
    order_items: BTreeMap<(i32, i32), OrderItemEntity>,
    /// Makes the next `insert_order_items` call fail.
    pub fail_order_items: bool,
    /// Saved into the cart by the next `insert_order` call, as if another
    /// request had added it while the order was being placed.
    pub concurrent_cart_line: Option<CartLineEntity>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    /// Runs `f` as one unit of work: on error every change it made is undone.
    pub async fn transaction<T, F>(&mut self, f: F) -> Result<T, AppError>
    where
        F: for<'r> FnOnce(&'r mut MemoryStore) -> BoxFuture<'r, Result<T, AppError>>,
    {
        let snapshot = self.clone();
        let result = f(self).await;
        if result.is_err() {
            let fail_order_items = self.fail_order_items;
            *self = snapshot;
            self.fail_order_items = fail_order_items;
        }
        result
    }

    // Seeding helpers.

    pub fn add_user(&mut self, username: &str, is_staff: bool) -> UserEntity {
        let user = UserEntity {
            id: self.next_id(),
            username: username.to_string(),
            email: format!("{}@littlelemon.test", username),
            is_staff,
        };
        self.users.insert(user.id, user.clone());
        user
    }

    pub fn add_token(&mut self, user_id: i32) -> Uuid {
        let token = Uuid::from_u128(self.next_id() as u128);
        self.tokens.insert(token, user_id);
        token
    }

    pub fn add_to_group(&mut self, user_id: i32, group: StaffGroup) {
        let group_id = self.group_id_or_create(group.name());
        self.memberships.insert((user_id, group_id));
    }

    pub fn add_category(&mut self, title: &str) -> CategoryEntity {
        let category = CategoryEntity {
            id: self.next_id(),
            slug: title.to_lowercase().replace(' ', "-"),
            title: title.to_string(),
        };
        self.categories.insert(category.id, category.clone());
        category
    }

    pub fn add_menu_item(&mut self, title: &str, price: &str, category_id: i32) -> MenuItemEntity {
        let item = MenuItemEntity {
            id: self.next_id(),
            title: title.to_string(),
            price: BigDecimal::from_str(price).expect("valid price literal"),
            featured: false,
            category_id,
        };
        self.menu_items.insert(item.id, item.clone());
        item
    }

    pub fn set_menu_price(&mut self, id: i32, price: &str) {
        if let Some(item) = self.menu_items.get_mut(&id) {
            item.price = BigDecimal::from_str(price).expect("valid price literal");
        }
    }

    /// Deletes a user with the same cascade/nullify rules as the schema.
    pub fn remove_user(&mut self, user_id: i32) {
        self.users.remove(&user_id);
        self.tokens.retain(|_, owner| *owner != user_id);
        self.memberships.retain(|(member, _)| *member != user_id);
        self.cart_lines.retain(|(owner, _), _| *owner != user_id);

        let authored: Vec<i32> = self
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .map(|order| order.id)
            .collect();
        for order_id in authored {
            self.orders.remove(&order_id);
            self.order_items.retain(|(owner, _), _| *owner != order_id);
        }
        for order in self.orders.values_mut() {
            if order.delivery_crew_id == Some(user_id) {
                order.delivery_crew_id = None;
            }
        }
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn order_item_count(&self) -> usize {
        self.order_items.len()
    }

    fn group_id_or_create(&mut self, name: &str) -> i32 {
        if let Some(group) = self.groups.values().find(|group| group.name == name) {
            return group.id;
        }
        let group = GroupEntity {
            id: self.next_id(),
            name: name.to_string(),
        };
        let id = group.id;
        self.groups.insert(id, group);
        id
    }

    fn username_of(&self, id: Option<i32>) -> Option<&String> {
        id.and_then(|id| self.users.get(&id))
            .map(|user| &user.username)
    }

    fn category_title(&self, id: i32) -> &str {
        self.categories
            .get(&id)
            .map(|category| category.title.as_str())
            .unwrap_or_default()
    }
}

fn foreign_key_violation(what: &str) -> AppError {
    AppError::Conflict(format!("Record is still referenced: {}", what))
}

#[async_trait]
impl CatalogRepo for MemoryStore {
    async fn list_categories(&mut self) -> Result<Vec<CategoryEntity>, AppError> {
        Ok(self.categories.values().cloned().collect())
    }

    async fn find_category(&mut self, id: i32) -> Result<Option<CategoryEntity>, AppError> {
        Ok(self.categories.get(&id).cloned())
    }

    async fn insert_category(
        &mut self,
        category: CreateCategoryEntity,
    ) -> Result<CategoryEntity, AppError> {
        let category = CategoryEntity {
            id: self.next_id(),
            slug: category.slug,
            title: category.title,
        };
        self.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(
        &mut self,
        id: i32,
        category: CreateCategoryEntity,
    ) -> Result<Option<CategoryEntity>, AppError> {
        Ok(self.categories.get_mut(&id).map(|existing| {
            existing.slug = category.slug;
            existing.title = category.title;
            existing.clone()
        }))
    }

    async fn count_menu_items_in_category(&mut self, id: i32) -> Result<i64, AppError> {
        Ok(self
            .menu_items
            .values()
            .filter(|item| item.category_id == id)
            .count() as i64)
    }

    async fn delete_category(&mut self, id: i32) -> Result<bool, AppError> {
        if self.menu_items.values().any(|item| item.category_id == id) {
            return Err(foreign_key_violation("menu_items.category_id"));
        }
        Ok(self.categories.remove(&id).is_some())
    }

    async fn list_menu_items(
        &mut self,
        query: &MenuItemQuery,
    ) -> Result<Vec<MenuItemEntity>, AppError> {
        let search = query.search.as_ref().map(|s| s.to_lowercase());
        let mut items: Vec<MenuItemEntity> = self
            .menu_items
            .values()
            .filter(|item| match &search {
                Some(needle) => {
                    item.title.to_lowercase().contains(needle)
                        || self
                            .category_title(item.category_id)
                            .to_lowercase()
                            .contains(needle)
                }
                None => true,
            })
            .filter(|item| query.title.as_ref().is_none_or(|title| &item.title == title))
            .filter(|item| query.price.as_ref().is_none_or(|price| &item.price == price))
            .cloned()
            .collect();

        match query.ordering {
            MenuItemOrdering::Id => {}
            MenuItemOrdering::Title => items.sort_by(|a, b| a.title.cmp(&b.title)),
            MenuItemOrdering::TitleDesc => items.sort_by(|a, b| b.title.cmp(&a.title)),
            MenuItemOrdering::Price => items.sort_by(|a, b| a.price.cmp(&b.price)),
            MenuItemOrdering::PriceDesc => items.sort_by(|a, b| b.price.cmp(&a.price)),
        }
        Ok(items)
    }

    async fn find_menu_item(&mut self, id: i32) -> Result<Option<MenuItemEntity>, AppError> {
        Ok(self.menu_items.get(&id).cloned())
    }

    async fn insert_menu_item(
        &mut self,
        item: CreateMenuItemEntity,
    ) -> Result<MenuItemEntity, AppError> {
        if !self.categories.contains_key(&item.category_id) {
            return Err(foreign_key_violation("categories.id"));
        }
        let item = MenuItemEntity {
            id: self.next_id(),
            title: item.title,
            price: item.price,
            featured: item.featured,
            category_id: item.category_id,
        };
        self.menu_items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update_menu_item(
        &mut self,
        id: i32,
        changes: UpdateMenuItemEntity,
    ) -> Result<Option<MenuItemEntity>, AppError> {
        if let Some(category_id) = changes.category_id {
            if !self.categories.contains_key(&category_id) {
                return Err(foreign_key_violation("categories.id"));
            }
        }
        Ok(self.menu_items.get_mut(&id).map(|item| {
            if let Some(title) = changes.title {
                item.title = title;
            }
            if let Some(price) = changes.price {
                item.price = price;
            }
            if let Some(featured) = changes.featured {
                item.featured = featured;
            }
            if let Some(category_id) = changes.category_id {
                item.category_id = category_id;
            }
            item.clone()
        }))
    }

    async fn count_order_items_for_menu_item(&mut self, id: i32) -> Result<i64, AppError> {
        Ok(self
            .order_items
            .values()
            .filter(|item| item.menuitem_id == id)
            .count() as i64)
    }

    async fn delete_menu_item(&mut self, id: i32) -> Result<bool, AppError> {
        if self.order_items.values().any(|item| item.menuitem_id == id) {
            return Err(foreign_key_violation("order_items.menuitem_id"));
        }
        self.cart_lines.retain(|(_, menuitem_id), _| *menuitem_id != id);
        Ok(self.menu_items.remove(&id).is_some())
    }
}

#[async_trait]
impl CartRepo for MemoryStore {
    async fn cart_lines(
        &mut self,
        user_id: i32,
    ) -> Result<Vec<(CartLineEntity, MenuItemEntity)>, AppError> {
        Ok(self
            .cart_lines
            .values()
            .filter(|line| line.user_id == user_id)
            .filter_map(|line| {
                self.menu_items
                    .get(&line.menuitem_id)
                    .map(|item| (line.clone(), item.clone()))
            })
            .collect())
    }

    async fn lock_cart_lines(
        &mut self,
        user_id: i32,
    ) -> Result<Vec<(CartLineEntity, MenuItemEntity)>, AppError> {
        self.cart_lines(user_id).await
    }

    async fn save_cart_line(&mut self, line: CartLineEntity) -> Result<CartLineEntity, AppError> {
        if !self.menu_items.contains_key(&line.menuitem_id) {
            return Err(foreign_key_violation("menu_items.id"));
        }
        self.cart_lines
            .insert((line.user_id, line.menuitem_id), line.clone());
        Ok(line)
    }

    async fn clear_cart(&mut self, user_id: i32) -> Result<usize, AppError> {
        let before = self.cart_lines.len();
        self.cart_lines.retain(|(owner, _), _| *owner != user_id);
        Ok(before - self.cart_lines.len())
    }

    async fn remove_cart_lines(
        &mut self,
        user_id: i32,
        menuitem_ids: &[i32],
    ) -> Result<usize, AppError> {
        let before = self.cart_lines.len();
        self.cart_lines.retain(|(owner, menuitem_id), _| {
            *owner != user_id || !menuitem_ids.contains(menuitem_id)
        });
        Ok(before - self.cart_lines.len())
    }
}

#[async_trait]
impl OrderRepo for MemoryStore {
    async fn insert_order(&mut self, order: CreateOrderEntity) -> Result<OrderEntity, AppError> {
        let order = OrderEntity {
            id: self.next_id(),
            user_id: order.user_id,
            delivery_crew_id: order.delivery_crew_id,
            status: order.status,
            total: order.total,
            created_at: order.created_at,
        };
        self.orders.insert(order.id, order.clone());
        if let Some(line) = self.concurrent_cart_line.take() {
            self.cart_lines
                .insert((line.user_id, line.menuitem_id), line);
        }
        Ok(order)
    }

    async fn insert_order_items(
        &mut self,
        items: Vec<OrderItemEntity>,
    ) -> Result<Vec<OrderItemEntity>, AppError> {
        if self.fail_order_items {
            self.fail_order_items = false;
            return Err(AppError::Other(anyhow::anyhow!(
                "connection lost while inserting order items"
            )));
        }
        for item in &items {
            let key = (item.order_id, item.menuitem_id);
            if self.order_items.contains_key(&key) {
                return Err(AppError::Conflict("duplicate order item".into()));
            }
            self.order_items.insert(key, item.clone());
        }
        Ok(items)
    }

    async fn list_orders(
        &mut self,
        scope: OrderScope,
        query: OrderQuery,
    ) -> Result<Vec<OrderEntity>, AppError> {
        let search = query.search.as_ref().map(|s| s.to_lowercase());
        let mut orders: Vec<OrderEntity> = self
            .orders
            .values()
            .filter(|order| match scope {
                OrderScope::All => true,
                OrderScope::AssignedTo(crew_id) => order.delivery_crew_id == Some(crew_id),
                OrderScope::PlacedBy(user_id) => order.user_id == user_id,
            })
            .filter(|order| query.status.is_none_or(|status| order.status == status))
            .filter(|order| {
                query
                    .username
                    .as_ref()
                    .is_none_or(|name| self.username_of(Some(order.user_id)) == Some(name))
            })
            .filter(|order| {
                query
                    .delivery_crew
                    .as_ref()
                    .is_none_or(|name| self.username_of(order.delivery_crew_id) == Some(name))
            })
            .filter(|order| match &search {
                Some(needle) => [Some(order.user_id), order.delivery_crew_id]
                    .into_iter()
                    .filter_map(|id| self.username_of(id))
                    .any(|name| name.to_lowercase().contains(needle)),
                None => true,
            })
            .cloned()
            .collect();

        let username = |order: &OrderEntity| self.username_of(Some(order.user_id)).cloned();
        match query.ordering {
            OrderOrdering::Id => {}
            OrderOrdering::Username => orders.sort_by_key(|order| (username(order), order.id)),
            OrderOrdering::UsernameDesc => {
                orders.sort_by(|a, b| username(b).cmp(&username(a)).then(a.id.cmp(&b.id)))
            }
            OrderOrdering::Status => {
                orders.sort_by_key(|order| (order.status.as_str(), order.id))
            }
            OrderOrdering::StatusDesc => orders.sort_by(|a, b| {
                b.status
                    .as_str()
                    .cmp(a.status.as_str())
                    .then(a.id.cmp(&b.id))
            }),
        }
        Ok(orders)
    }

    async fn find_order(&mut self, id: i32) -> Result<Option<OrderEntity>, AppError> {
        Ok(self.orders.get(&id).cloned())
    }

    async fn order_items(&mut self, order_ids: &[i32]) -> Result<Vec<OrderItemEntity>, AppError> {
        Ok(self
            .order_items
            .values()
            .filter(|item| order_ids.contains(&item.order_id))
            .cloned()
            .collect())
    }

    async fn update_order(
        &mut self,
        id: i32,
        changes: UpdateOrderEntity,
    ) -> Result<OrderEntity, AppError> {
        if let Some(crew_id) = changes.delivery_crew_id {
            if !self.users.contains_key(&crew_id) {
                return Err(foreign_key_violation("users.id"));
            }
        }
        let order = self
            .orders
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Record not found".into()))?;
        if let Some(crew_id) = changes.delivery_crew_id {
            order.delivery_crew_id = Some(crew_id);
        }
        if let Some(status) = changes.status {
            order.status = status;
        }
        Ok(order.clone())
    }

    async fn delete_order(&mut self, id: i32) -> Result<bool, AppError> {
        let removed = self.orders.remove(&id).is_some();
        self.order_items.retain(|(order_id, _), _| *order_id != id);
        Ok(removed)
    }
}

#[async_trait]
impl AccountRepo for MemoryStore {
    async fn find_user(&mut self, id: i32) -> Result<Option<UserEntity>, AppError> {
        Ok(self.users.get(&id).cloned())
    }

    async fn find_user_by_username(
        &mut self,
        username: &str,
    ) -> Result<Option<UserEntity>, AppError> {
        Ok(self
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_user_by_token(&mut self, token: Uuid) -> Result<Option<UserEntity>, AppError> {
        Ok(self
            .tokens
            .get(&token)
            .and_then(|user_id| self.users.get(user_id))
            .cloned())
    }

    async fn group_names_of(&mut self, user_id: i32) -> Result<Vec<String>, AppError> {
        Ok(self
            .memberships
            .iter()
            .filter(|(member, _)| *member == user_id)
            .filter_map(|(_, group_id)| self.groups.get(group_id))
            .map(|group| group.name.clone())
            .collect())
    }

    async fn find_group(&mut self, name: &str) -> Result<Option<GroupEntity>, AppError> {
        Ok(self.groups.values().find(|group| group.name == name).cloned())
    }

    async fn ensure_group(&mut self, name: &str) -> Result<GroupEntity, AppError> {
        let id = self.group_id_or_create(name);
        Ok(self.groups[&id].clone())
    }

    async fn group_members(&mut self, group_id: i32) -> Result<Vec<UserEntity>, AppError> {
        let mut members: Vec<UserEntity> = self
            .memberships
            .iter()
            .filter(|(_, group)| *group == group_id)
            .filter_map(|(user_id, _)| self.users.get(user_id))
            .cloned()
            .collect();
        members.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(members)
    }

    async fn add_membership(&mut self, user_id: i32, group_id: i32) -> Result<(), AppError> {
        self.memberships.insert((user_id, group_id));
        Ok(())
    }

    async fn remove_membership(&mut self, user_id: i32, group_id: i32) -> Result<bool, AppError> {
        Ok(self.memberships.remove(&(user_id, group_id)))
    }
}
