use diesel_async::{AsyncPgConnection, pooled_connection::bb8::Pool};

use crate::throttle::MenuThrottle;

pub type DbPool = Pool<AsyncPgConnection>;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub menu_throttle: MenuThrottle,
}
