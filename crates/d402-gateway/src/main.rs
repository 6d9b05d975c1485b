use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use d402_gateway::{catalog, config::GatewayConfig, metrics::register_metrics, state::AppState};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration problems are fatal before anything binds.
    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    let registry = match catalog::price_registry() {
        Ok(registry) => registry,
        Err(e) => {
            tracing::error!("Invalid tool price declarations: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;
    let allowed_origins = config.allowed_origins.clone();
    let rate_limit_rpm = config.rate_limit_rpm;

    tracing::info!("Starting d402-gateway on port {}", port);
    tracing::info!("Upstream: {}", config.upstream_base_url);
    tracing::info!("Priced tools: {}", registry.len());
    tracing::info!(
        "Service credential: {}",
        if config.service_api_key.is_some() {
            "configured (credential or payment)"
        } else {
            "not configured (payment only)"
        }
    );
    if config.testing_mode {
        tracing::warn!("Verification: TESTING MODE, proofs are checked structurally only");
    } else {
        tracing::info!(
            "Verification: facilitator at {} (timeout {:?}, HMAC {})",
            config.facilitator_url.as_deref().unwrap_or_default(),
            config.facilitator_timeout,
            if config.facilitator_shared_secret.is_some() {
                "enabled"
            } else {
                "disabled"
            }
        );
    }

    if let Err(e) = register_metrics() {
        tracing::error!("Failed to register metrics: {}", e);
        std::process::exit(1);
    }

    let state = match AppState::new(config, registry) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to initialize gateway: {}", e);
            std::process::exit(1);
        }
    };
    let state_data = web::Data::new(state);

    // Configure rate limiter
    let Some(governor_conf) = GovernorConfigBuilder::default()
        .requests_per_minute(rate_limit_rpm)
        .finish()
    else {
        tracing::error!("Invalid RATE_LIMIT_RPM: {}", rate_limit_rpm);
        std::process::exit(1);
    };

    HttpServer::new(move || {
        let cors = d402_gateway::cors::build_cors(&allowed_origins);

        App::new()
            .app_data(state_data.clone())
            .app_data(web::PayloadConfig::new(64 * 1024))
            .wrap(Logger::default())
            .wrap(cors)
            .wrap(Governor::new(&governor_conf))
            .configure(d402_gateway::configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
