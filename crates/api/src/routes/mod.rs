//! HTTP routes

pub mod faults;
pub mod health;

use std::sync::Arc;

use axum::routing::get;
use axum::{middleware, Router};
use tower::ServiceBuilder;

use crate::context::AppContext;
use crate::middleware::handle_errors;

/// Build the application router
///
/// Every route, including the 404 fallback, runs behind the error-handling
/// middleware. The `/faults/*` routes are mounted only when
/// `server.enable_fault_routes` is set.
pub fn router(ctx: Arc<AppContext>) -> Router {
    let mut router = Router::new()
        .route("/health", get(health::health))
        .route("/metrics/errors", get(health::error_metrics));

    if ctx.config.server.enable_fault_routes {
        router = router.nest("/faults", faults::routes());
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn_with_state(Arc::clone(&ctx), handle_errors)),
        )
        .with_state(ctx)
}
