mod config;
mod db;
mod error;
mod inference;
mod ratelimit;
mod routes;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use config::AppConfig;
use db::prediction_repository::PredictionRepository;
use inference::diagnosis::Diagnoser;
use inference::labels::LabelCatalog;
use inference::model::{InferenceGateway, ModelOptions};
use inference::policy::ConfidencePolicy;
use inference::preprocess::ImageNormalizer;
use ratelimit::{RateLimit, RateLimitMiddleware, RateLimiter};
use routes::{UploadLimit, configure_routes};
use std::sync::Arc;

fn startup_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    log::error!("{}: {}", context, e);
    std::io::Error::other(format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| startup_error("Invalid configuration", e))?;

    let catalog = match &config.labels_config {
        Some(path) => LabelCatalog::load(path),
        None => LabelCatalog::builtin(),
    }
    .map_err(|e| startup_error("Failed to load label catalog", e))?;
    let catalog = Arc::new(catalog);
    log::info!(
        "Label catalog v{} with {} labels, fallback {:?}",
        catalog.version,
        catalog.len(),
        catalog.fallback()
    );

    let normalizer = ImageNormalizer::new(config.image_size, config.image_size);
    let (width, height) = normalizer.dimensions();
    let options = ModelOptions {
        apply_softmax: config.model_apply_softmax,
        input_width: width,
        input_height: height,
    };
    let gateway = InferenceGateway::load(&config.model_path, catalog.len(), &options);
    if !gateway.is_available() {
        log::warn!("Serving without a model; /predict will answer 500 until the model is fixed");
    }

    let policy = ConfidencePolicy::new(config.confidence_threshold);
    log::info!(
        "Confidence floor {:.2}, input {}x{}",
        policy.threshold(),
        width,
        height
    );

    let repo = PredictionRepository::open(&config.database_path)
        .map_err(|e| startup_error("Failed to open prediction database", e))?;
    log::info!(
        "Prediction database at {} ({} records)",
        config.database_path.display(),
        repo.count().map_err(|e| startup_error("Failed to read prediction database", e))?
    );

    let diagnoser = web::Data::new(Diagnoser::new(normalizer, gateway, policy, catalog));
    let repo = web::Data::new(repo);
    let upload_limit = web::Data::new(UploadLimit {
        max_bytes: config.max_upload_bytes,
    });

    let limiter = RateLimiter::new(vec![
        RateLimit::per_hour(config.requests_per_hour),
        RateLimit::per_day(config.requests_per_day),
    ])
    .with_route("/predict", vec![RateLimit::per_minute(config.predict_per_minute)]);
    log::info!(
        "Rate limits: {:?} on the API, {:?} on /predict",
        limiter.global_limits().iter().map(ToString::to_string).collect::<Vec<_>>(),
        limiter
            .route_limits()
            .flat_map(|(_, limits)| limits.iter().map(ToString::to_string))
            .collect::<Vec<_>>()
    );
    if config.trust_proxy_headers {
        log::warn!("Rate limiting keys clients on proxy headers; only run this behind a trusted proxy");
    }
    let rate_limit =
        RateLimitMiddleware::new(limiter).trust_proxy_headers(config.trust_proxy_headers);

    let static_dir = config.static_dir.clone();
    let bind_address = config.bind_address();
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(rate_limit.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .wrap(middleware::Logger::default())
            .app_data(diagnoser.clone())
            .app_data(repo.clone())
            .app_data(upload_limit.clone())
            .configure(|cfg| configure_routes(cfg, static_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
