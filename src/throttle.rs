//! Request-rate limits for the public menu item routes.
//!
//! Anonymous callers and token holders draw from separate budgets, each a
//! fixed number of requests per minute shared by every caller of that kind.
//! Over-budget requests fail with `AppError::Throttled` instead of waiting.

use std::{
    convert::Infallible,
    future::{Ready, ready},
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tokio::sync::Mutex;
use tower::{
    Service,
    limit::{RateLimit, rate::Rate},
};

use crate::{app_error::AppError, app_state::AppState, config::ThrottleConfig};

/// Stand-in service so `RateLimit` can meter calls without wrapping a handler.
#[derive(Clone, Copy, Debug)]
pub struct Permit;

impl Service<()> for Permit {
    type Response = ();
    type Error = Infallible;
    type Future = Ready<Result<(), Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: ()) -> Self::Future {
        ready(Ok(()))
    }
}

type Bucket = Arc<Mutex<RateLimit<Permit>>>;

#[derive(Clone)]
pub struct MenuThrottle {
    anonymous: Bucket,
    authenticated: Bucket,
}

fn bucket(per_minute: u64) -> Bucket {
    Arc::new(Mutex::new(RateLimit::new(
        Permit,
        Rate::new(per_minute, Duration::from_secs(60)),
    )))
}

impl MenuThrottle {
    pub fn new(config: &ThrottleConfig) -> Self {
        Self {
            anonymous: bucket(config.anonymous_per_minute),
            authenticated: bucket(config.authenticated_per_minute),
        }
    }

    /// Takes one request from the budget, or fails if none is left.
    pub async fn admit(&self, authenticated: bool) -> Result<(), AppError> {
        let bucket = if authenticated {
            &self.authenticated
        } else {
            &self.anonymous
        };
        let mut limiter = bucket.lock().await;

        let ready =
            std::future::poll_fn(|cx| Poll::Ready(limiter.poll_ready(cx).is_ready())).await;
        if !ready {
            tracing::debug!(
                "Menu request throttled ({})",
                if authenticated { "authenticated" } else { "anonymous" }
            );
            return Err(AppError::Throttled);
        }
        // `Permit` never fails.
        let _ = limiter.call(()).await;
        Ok(())
    }
}

/// Extractor that admits the request against the menu budgets. The tier is
/// picked by the presence of an `Authorization` header.
pub struct Throttle;

impl FromRequestParts<AppState> for Throttle {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let authenticated = parts.headers.contains_key(AUTHORIZATION);
        state.menu_throttle.admit(authenticated).await?;
        Ok(Throttle)
    }
}
