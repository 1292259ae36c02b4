pub mod app_error;
pub mod app_state;
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod extract;
pub mod models;
pub mod permissions;
pub mod pricing;
pub mod roles;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;
pub mod throttle;
