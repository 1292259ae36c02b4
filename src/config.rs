use anyhow::{Context, Result, bail};

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub throttle: ThrottleConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Per-minute request budgets for the menu item routes.
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottleConfig {
    pub anonymous_per_minute: u64,
    pub authenticated_per_minute: u64,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Loads configuration from the process environment.
pub fn load() -> Result<AppConfig> {
    from_lookup(|key| std::env::var(key).ok())
}

pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<AppConfig> {
    let url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

    let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
        Some(value) => value
            .parse()
            .with_context(|| format!("Invalid DATABASE_MAX_CONNECTIONS: {}", value))?,
        None => 10,
    };

    let port = match lookup("SERVER_PORT") {
        Some(value) => value
            .parse()
            .with_context(|| format!("Invalid SERVER_PORT: {}", value))?,
        None => 3000,
    };

    let throttle = ThrottleConfig {
        anonymous_per_minute: budget(&lookup, "MENU_THROTTLE_ANON_PER_MINUTE", 30)?,
        authenticated_per_minute: budget(&lookup, "MENU_THROTTLE_USER_PER_MINUTE", 120)?,
    };

    Ok(AppConfig {
        server: ServerConfig {
            host: lookup("SERVER_HOST").unwrap_or("0.0.0.0".to_string()),
            port,
        },
        database: DatabaseConfig {
            url,
            max_connections,
        },
        throttle,
    })
}

fn budget(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64> {
    let Some(value) = lookup(key) else {
        return Ok(default);
    };
    match value.parse::<u64>() {
        Ok(0) => bail!("{} must be at least 1", key),
        Ok(per_minute) => Ok(per_minute),
        Err(err) => Err(anyhow::Error::new(err).context(format!("Invalid {}: {}", key, value))),
    }
}
