pub mod catalog;
pub mod config;
pub mod cors;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod proxy;
pub mod routes;
pub mod state;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use middleware::{admission_gate, build_402, PresentedCredential, ResolvedIdentity};
pub use state::AppState;

use actix_web::web;

/// Mount every gateway route: `/health` and `/metrics` ungated, the tool
/// listing, and the admission-gated `/tools/{tool_id}` scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(routes::health::configure)
        .configure(routes::tools::configure);
}
