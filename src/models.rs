use std::io::Write;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::{
    AsChangeset, AsExpression, FromSqlRow, Selectable,
    deserialize::{self, FromSql},
    pg::{Pg, PgValue},
    prelude::{Identifiable, Insertable, Queryable},
    serialize::{self, IsNull, Output, ToSql},
    sql_types::Text,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::app_error::AppError;

// Accounts

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserEntity {
    pub id: i32,
    pub username: String,
    pub email: String,
    /// Admin-level account; may manage the Manager group.
    pub is_staff: bool,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::groups)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GroupEntity {
    pub id: i32,
    pub name: String,
}

// Catalog

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CategoryEntity {
    pub id: i32,
    pub slug: String,
    pub title: String,
}

#[derive(Insertable, AsChangeset, Deserialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::categories)]
pub struct CreateCategoryEntity {
    pub slug: String,
    pub title: String,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::menu_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MenuItemEntity {
    pub id: i32,
    pub title: String,
    #[schema(value_type = String, example = "9.99")]
    pub price: BigDecimal,
    pub featured: bool,
    pub category_id: i32,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::menu_items)]
pub struct CreateMenuItemEntity {
    pub title: String,
    pub price: BigDecimal,
    pub featured: bool,
    pub category_id: i32,
}

/// Partial menu item update; `None` fields keep their current value.
#[derive(AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = crate::schema::menu_items)]
pub struct UpdateMenuItemEntity {
    pub title: Option<String>,
    pub price: Option<BigDecimal>,
    pub featured: Option<bool>,
    pub category_id: Option<i32>,
}

impl UpdateMenuItemEntity {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.price.is_none()
            && self.featured.is_none()
            && self.category_id.is_none()
    }
}

// Carts

#[derive(Queryable, Selectable, Insertable, Serialize, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::cart_lines)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartLineEntity {
    pub user_id: i32,
    pub menuitem_id: i32,
    pub quantity: i32,
    #[schema(value_type = String, example = "9.99")]
    pub unit_price: BigDecimal,
    #[schema(value_type = String, example = "19.98")]
    pub line_price: BigDecimal,
}

// Orders

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow, ToSchema,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    OutForDelivery,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::OutForDelivery => "OUT_FOR_DELIVERY",
            OrderStatus::Delivered => "DELIVERED",
        }
    }

    /// Validates a status change. `Delivered` is terminal; re-applying the
    /// current status is accepted as a no-op.
    pub fn transition_to(self, next: OrderStatus) -> Result<OrderStatus, AppError> {
        match (self, next) {
            (OrderStatus::Delivered, OrderStatus::OutForDelivery) => Err(AppError::InvalidInput(
                "A delivered order cannot change status".into(),
            )),
            (_, next) => Ok(next),
        }
    }
}

impl ToSql<Text, Pg> for OrderStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for OrderStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"OUT_FOR_DELIVERY" => Ok(OrderStatus::OutForDelivery),
            b"DELIVERED" => Ok(OrderStatus::Delivered),
            other => Err(format!(
                "Unrecognized order status: {}",
                String::from_utf8_lossy(other)
            )
            .into()),
        }
    }
}

#[derive(Queryable, Serialize, Selectable, Identifiable, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderEntity {
    pub id: i32,
    pub user_id: i32,
    pub delivery_crew_id: Option<i32>,
    pub status: OrderStatus,
    #[schema(value_type = String, example = "25.00")]
    pub total: BigDecimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateOrderEntity {
    pub user_id: i32,
    pub delivery_crew_id: Option<i32>,
    pub status: OrderStatus,
    pub total: BigDecimal,
    pub created_at: DateTime<Utc>,
}

#[derive(AsChangeset, Debug, Clone, Default, PartialEq)]
#[diesel(table_name = crate::schema::orders)]
pub struct UpdateOrderEntity {
    pub delivery_crew_id: Option<i32>,
    pub status: Option<OrderStatus>,
}

impl UpdateOrderEntity {
    pub fn is_empty(&self) -> bool {
        self.delivery_crew_id.is_none() && self.status.is_none()
    }
}

/// Immutable snapshot of a cart line taken when the order was placed.
#[derive(Queryable, Selectable, Insertable, Serialize, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemEntity {
    pub order_id: i32,
    pub menuitem_id: i32,
    pub quantity: i32,
    #[schema(value_type = String, example = "10.00")]
    pub unit_price: BigDecimal,
    #[schema(value_type = String, example = "20.00")]
    pub line_price: BigDecimal,
}
