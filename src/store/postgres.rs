use async_trait::async_trait;
use diesel::{
    BoolExpressionMethods, ExpressionMethods, JoinOnDsl, NullableExpressionMethods,
    OptionalExtension, PgTextExpressionMethods, QueryDsl, SelectableHelper,
};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::{
    app_error::AppError,
    models::{
        CartLineEntity, CategoryEntity, CreateCategoryEntity, CreateMenuItemEntity,
        CreateOrderEntity, GroupEntity, MenuItemEntity, OrderEntity, OrderItemEntity,
        UpdateMenuItemEntity, UpdateOrderEntity, UserEntity,
    },
    schema::{
        auth_tokens, cart_lines, categories, groups, menu_items, order_items, orders, user_groups,
        users,
    },
    store::{
        AccountRepo, CartRepo, CatalogRepo, MenuItemOrdering, MenuItemQuery, OrderOrdering,
        OrderQuery, OrderRepo, OrderScope,
    },
};

diesel::alias!(users as placed_by: PlacedBy, users as assigned_crew: AssignedCrew);

/// `ILIKE` pattern matching `search` anywhere, with its wildcards taken literally.
fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl CatalogRepo for AsyncPgConnection {
    async fn list_categories(&mut self) -> Result<Vec<CategoryEntity>, AppError> {
        let categories = categories::table
            .order_by(categories::id.asc())
            .select(CategoryEntity::as_select())
            .load(self)
            .await?;
        Ok(categories)
    }

    async fn find_category(&mut self, id: i32) -> Result<Option<CategoryEntity>, AppError> {
        let category = categories::table
            .find(id)
            .select(CategoryEntity::as_select())
            .first(self)
            .await
            .optional()?;
        Ok(category)
    }

    async fn insert_category(
        &mut self,
        category: CreateCategoryEntity,
    ) -> Result<CategoryEntity, AppError> {
        let category = diesel::insert_into(categories::table)
            .values(category)
            .returning(CategoryEntity::as_returning())
            .get_result(self)
            .await?;
        Ok(category)
    }

    async fn update_category(
        &mut self,
        id: i32,
        category: CreateCategoryEntity,
    ) -> Result<Option<CategoryEntity>, AppError> {
        let category = diesel::update(categories::table.find(id))
            .set(category)
            .returning(CategoryEntity::as_returning())
            .get_result(self)
            .await
            .optional()?;
        Ok(category)
    }

    async fn count_menu_items_in_category(&mut self, id: i32) -> Result<i64, AppError> {
        let count = menu_items::table
            .filter(menu_items::category_id.eq(id))
            .count()
            .get_result(self)
            .await?;
        Ok(count)
    }

    async fn delete_category(&mut self, id: i32) -> Result<bool, AppError> {
        let deleted = diesel::delete(categories::table.find(id))
            .execute(self)
            .await?;
        Ok(deleted > 0)
    }

    async fn list_menu_items(
        &mut self,
        query: &MenuItemQuery,
    ) -> Result<Vec<MenuItemEntity>, AppError> {
        let mut items = menu_items::table
            .inner_join(categories::table)
            .select(MenuItemEntity::as_select())
            .into_boxed();

        if let Some(search) = &query.search {
            let pattern = like_pattern(search);
            items = items.filter(
                menu_items::title
                    .ilike(pattern.clone())
                    .or(categories::title.ilike(pattern)),
            );
        }
        if let Some(title) = &query.title {
            items = items.filter(menu_items::title.eq(title.clone()));
        }
        if let Some(price) = &query.price {
            items = items.filter(menu_items::price.eq(price.clone()));
        }

        items = match query.ordering {
            MenuItemOrdering::Id => items.order_by(menu_items::id.asc()),
            MenuItemOrdering::Title => items.order_by((menu_items::title.asc(), menu_items::id)),
            MenuItemOrdering::TitleDesc => {
                items.order_by((menu_items::title.desc(), menu_items::id))
            }
            MenuItemOrdering::Price => items.order_by((menu_items::price.asc(), menu_items::id)),
            MenuItemOrdering::PriceDesc => {
                items.order_by((menu_items::price.desc(), menu_items::id))
            }
        };

        Ok(items.load(self).await?)
    }

    async fn find_menu_item(&mut self, id: i32) -> Result<Option<MenuItemEntity>, AppError> {
        let item = menu_items::table
            .find(id)
            .select(MenuItemEntity::as_select())
            .first(self)
            .await
            .optional()?;
        Ok(item)
    }

    async fn insert_menu_item(
        &mut self,
        item: CreateMenuItemEntity,
    ) -> Result<MenuItemEntity, AppError> {
        let item = diesel::insert_into(menu_items::table)
            .values(item)
            .returning(MenuItemEntity::as_returning())
            .get_result(self)
            .await?;
        Ok(item)
    }

    async fn update_menu_item(
        &mut self,
        id: i32,
        changes: UpdateMenuItemEntity,
    ) -> Result<Option<MenuItemEntity>, AppError> {
        let item = diesel::update(menu_items::table.find(id))
            .set(changes)
            .returning(MenuItemEntity::as_returning())
            .get_result(self)
            .await
            .optional()?;
        Ok(item)
    }

    async fn count_order_items_for_menu_item(&mut self, id: i32) -> Result<i64, AppError> {
        let count = order_items::table
            .filter(order_items::menuitem_id.eq(id))
            .count()
            .get_result(self)
            .await?;
        Ok(count)
    }

    async fn delete_menu_item(&mut self, id: i32) -> Result<bool, AppError> {
        let deleted = diesel::delete(menu_items::table.find(id))
            .execute(self)
            .await?;
        Ok(deleted > 0)
    }
}

#[async_trait]
impl CartRepo for AsyncPgConnection {
    async fn cart_lines(
        &mut self,
        user_id: i32,
    ) -> Result<Vec<(CartLineEntity, MenuItemEntity)>, AppError> {
        let lines = cart_lines::table
            .inner_join(menu_items::table)
            .filter(cart_lines::user_id.eq(user_id))
            .order_by(cart_lines::menuitem_id.asc())
            .select((CartLineEntity::as_select(), MenuItemEntity::as_select()))
            .load::<(CartLineEntity, MenuItemEntity)>(self)
            .await?;
        Ok(lines)
    }

    async fn lock_cart_lines(
        &mut self,
        user_id: i32,
    ) -> Result<Vec<(CartLineEntity, MenuItemEntity)>, AppError> {
        // FOR UPDATE covers the joined menu item rows as well.
        let lines = cart_lines::table
            .inner_join(menu_items::table)
            .filter(cart_lines::user_id.eq(user_id))
            .order_by(cart_lines::menuitem_id.asc())
            .select((CartLineEntity::as_select(), MenuItemEntity::as_select()))
            .for_update()
            .load::<(CartLineEntity, MenuItemEntity)>(self)
            .await?;
        Ok(lines)
    }

    async fn save_cart_line(&mut self, line: CartLineEntity) -> Result<CartLineEntity, AppError> {
        let saved = diesel::insert_into(cart_lines::table)
            .values(line.clone())
            .on_conflict((cart_lines::user_id, cart_lines::menuitem_id))
            .do_update()
            .set((
                cart_lines::quantity.eq(line.quantity),
                cart_lines::unit_price.eq(line.unit_price.clone()),
                cart_lines::line_price.eq(line.line_price.clone()),
            ))
            .returning(CartLineEntity::as_returning())
            .get_result(self)
            .await?;
        Ok(saved)
    }

    async fn clear_cart(&mut self, user_id: i32) -> Result<usize, AppError> {
        let deleted = diesel::delete(cart_lines::table.filter(cart_lines::user_id.eq(user_id)))
            .execute(self)
            .await?;
        Ok(deleted)
    }

    async fn remove_cart_lines(
        &mut self,
        user_id: i32,
        menuitem_ids: &[i32],
    ) -> Result<usize, AppError> {
        let deleted = diesel::delete(
            cart_lines::table
                .filter(cart_lines::user_id.eq(user_id))
                .filter(cart_lines::menuitem_id.eq_any(menuitem_ids.to_vec())),
        )
        .execute(self)
        .await?;
        Ok(deleted)
    }
}

#[async_trait]
impl OrderRepo for AsyncPgConnection {
    async fn insert_order(&mut self, order: CreateOrderEntity) -> Result<OrderEntity, AppError> {
        let order = diesel::insert_into(orders::table)
            .values(order)
            .returning(OrderEntity::as_returning())
            .get_result(self)
            .await?;
        Ok(order)
    }

    async fn insert_order_items(
        &mut self,
        items: Vec<OrderItemEntity>,
    ) -> Result<Vec<OrderItemEntity>, AppError> {
        let items = diesel::insert_into(order_items::table)
            .values(items)
            .returning(OrderItemEntity::as_returning())
            .get_results(self)
            .await?;
        Ok(items)
    }

    async fn list_orders(
        &mut self,
        scope: OrderScope,
        query: OrderQuery,
    ) -> Result<Vec<OrderEntity>, AppError> {
        let mut statement = orders::table
            .inner_join(placed_by.on(placed_by.field(users::id).eq(orders::user_id)))
            .left_join(
                assigned_crew.on(orders::delivery_crew_id.eq(assigned_crew.field(users::id).nullable())),
            )
            .select(OrderEntity::as_select())
            .into_boxed();

        statement = match scope {
            OrderScope::All => statement,
            OrderScope::AssignedTo(crew_id) => {
                statement.filter(orders::delivery_crew_id.eq(crew_id))
            }
            OrderScope::PlacedBy(user_id) => statement.filter(orders::user_id.eq(user_id)),
        };
        if let Some(status) = query.status {
            statement = statement.filter(orders::status.eq(status));
        }
        if let Some(username) = query.username {
            statement = statement.filter(placed_by.field(users::username).eq(username));
        }
        if let Some(username) = query.delivery_crew {
            statement = statement.filter(assigned_crew.field(users::username).eq(username));
        }
        if let Some(search) = &query.search {
            let pattern = like_pattern(search);
            statement = statement.filter(
                placed_by
                    .field(users::username)
                    .ilike(pattern.clone())
                    .or(assigned_crew.field(users::username).ilike(pattern)),
            );
        }

        statement = match query.ordering {
            OrderOrdering::Id => statement.order_by(orders::id.asc()),
            OrderOrdering::Username => {
                statement.order_by((placed_by.field(users::username).asc(), orders::id))
            }
            OrderOrdering::UsernameDesc => {
                statement.order_by((placed_by.field(users::username).desc(), orders::id))
            }
            OrderOrdering::Status => statement.order_by((orders::status.asc(), orders::id)),
            OrderOrdering::StatusDesc => statement.order_by((orders::status.desc(), orders::id)),
        };

        Ok(statement.load(self).await?)
    }

    async fn find_order(&mut self, id: i32) -> Result<Option<OrderEntity>, AppError> {
        let order = orders::table
            .find(id)
            .select(OrderEntity::as_select())
            .first(self)
            .await
            .optional()?;
        Ok(order)
    }

    async fn order_items(&mut self, order_ids: &[i32]) -> Result<Vec<OrderItemEntity>, AppError> {
        let items = order_items::table
            .filter(order_items::order_id.eq_any(order_ids.to_vec()))
            .order_by((order_items::order_id.asc(), order_items::menuitem_id.asc()))
            .select(OrderItemEntity::as_select())
            .load(self)
            .await?;
        Ok(items)
    }

    async fn update_order(
        &mut self,
        id: i32,
        changes: UpdateOrderEntity,
    ) -> Result<OrderEntity, AppError> {
        let order = diesel::update(orders::table.find(id))
            .set(changes)
            .returning(OrderEntity::as_returning())
            .get_result(self)
            .await?;
        Ok(order)
    }

    async fn delete_order(&mut self, id: i32) -> Result<bool, AppError> {
        let deleted = diesel::delete(orders::table.find(id)).execute(self).await?;
        Ok(deleted > 0)
    }
}

#[async_trait]
impl AccountRepo for AsyncPgConnection {
    async fn find_user(&mut self, id: i32) -> Result<Option<UserEntity>, AppError> {
        let user = users::table
            .find(id)
            .select(UserEntity::as_select())
            .first(self)
            .await
            .optional()?;
        Ok(user)
    }

    async fn find_user_by_username(
        &mut self,
        username: &str,
    ) -> Result<Option<UserEntity>, AppError> {
        let user = users::table
            .filter(users::username.eq(username))
            .select(UserEntity::as_select())
            .first(self)
            .await
            .optional()?;
        Ok(user)
    }

    async fn find_user_by_token(&mut self, token: Uuid) -> Result<Option<UserEntity>, AppError> {
        let user = auth_tokens::table
            .inner_join(users::table)
            .filter(auth_tokens::key.eq(token))
            .select(UserEntity::as_select())
            .first(self)
            .await
            .optional()?;
        Ok(user)
    }

    async fn group_names_of(&mut self, user_id: i32) -> Result<Vec<String>, AppError> {
        let names = user_groups::table
            .inner_join(groups::table)
            .filter(user_groups::user_id.eq(user_id))
            .select(groups::name)
            .load::<String>(self)
            .await?;
        Ok(names)
    }

    async fn find_group(&mut self, name: &str) -> Result<Option<GroupEntity>, AppError> {
        let group = groups::table
            .filter(groups::name.eq(name))
            .select(GroupEntity::as_select())
            .first(self)
            .await
            .optional()?;
        Ok(group)
    }

    async fn ensure_group(&mut self, name: &str) -> Result<GroupEntity, AppError> {
        diesel::insert_into(groups::table)
            .values(groups::name.eq(name))
            .on_conflict(groups::name)
            .do_nothing()
            .execute(self)
            .await?;

        let group = groups::table
            .filter(groups::name.eq(name))
            .select(GroupEntity::as_select())
            .first(self)
            .await?;
        Ok(group)
    }

    async fn group_members(&mut self, group_id: i32) -> Result<Vec<UserEntity>, AppError> {
        let members = user_groups::table
            .inner_join(users::table)
            .filter(user_groups::group_id.eq(group_id))
            .order_by(users::username.asc())
            .select(UserEntity::as_select())
            .load(self)
            .await?;
        Ok(members)
    }

    async fn add_membership(&mut self, user_id: i32, group_id: i32) -> Result<(), AppError> {
        diesel::insert_into(user_groups::table)
            .values((
                user_groups::user_id.eq(user_id),
                user_groups::group_id.eq(group_id),
            ))
            .on_conflict_do_nothing()
            .execute(self)
            .await?;
        Ok(())
    }

    async fn remove_membership(&mut self, user_id: i32, group_id: i32) -> Result<bool, AppError> {
        let removed = diesel::delete(
            user_groups::table
                .filter(user_groups::user_id.eq(user_id))
                .filter(user_groups::group_id.eq(group_id)),
        )
        .execute(self)
        .await?;
        Ok(removed > 0)
    }
}
