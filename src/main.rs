use anyhow::Result;
use littlelemon_api::{
    app_state::AppState, bootstrap, config, db, routes, throttle::MenuThrottle,
};

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    bootstrap::init_env();

    let config = config::load()?;

    tracing::info!("Running migrations...");
    let migrations_count =
        db::run_migrations_blocking(db::MIGRATIONS, &config.database.url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    let state = AppState {
        db_pool: db::connect(&config.database).await?,
        menu_throttle: MenuThrottle::new(&config.throttle),
    };

    let app = routes::app(state);

    tracing::info!("Bootstrapping...");
    bootstrap::serve("LittleLemon API", app, &config.server).await
}
