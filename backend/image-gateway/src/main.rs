/// Image Gateway - HTTP Server
///
/// Uploads go to the blob store, jobs go out on the broker, and a single
/// background loop pairs worker replies with waiting requests.
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use image_gateway::handlers;
use image_gateway::kafka::{BrokerGateway, BrokerTopics, KafkaBroker};
use image_gateway::metrics::CorrelatorMetrics;
use image_gateway::services::{
    JobDescriptorBuilder, RenderConfig, ResponseCorrelator, ResultRenderer, S3BlobStore,
    UploadPipeline,
};
use image_gateway::{AppState, Config, UploadLimits};
use s3_utils::S3Client;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    init_tracing(config.is_production());

    tracing::info!(env = %config.app.env, "Starting image-gateway");

    let s3 = S3Client::with_config(config.s3.clone()).await;
    let store = Arc::new(S3BlobStore::new(s3.operations()));
    tracing::info!(bucket = %config.s3.bucket, "Blob store initialized");

    let broker = KafkaBroker::new(&config.kafka).context("Failed to initialize Kafka broker")?;
    let gateway = Arc::new(BrokerGateway::new(
        Arc::new(broker),
        BrokerTopics {
            jobs: config.kafka.job_topic.clone(),
            replies: config.kafka.reply_topic.clone(),
        },
    ));

    let correlator = Arc::new(ResponseCorrelator::with_metrics(
        config.upload.reply_timeout,
        CorrelatorMetrics::new("image-gateway"),
    ));

    let replies = gateway
        .subscribe()
        .context("Failed to subscribe to reply topic")?;
    let correlation_loop = tokio::spawn(Arc::clone(&correlator).run(replies));

    let pipeline = UploadPipeline::new(
        store,
        Arc::clone(&gateway),
        Arc::clone(&correlator),
        JobDescriptorBuilder::default(),
        ResultRenderer::new(RenderConfig {
            render_dir: config.upload.render_dir.clone(),
            public_prefix: config.upload.public_prefix.clone(),
        }),
    );
    let state = web::Data::new(AppState::new(pipeline, UploadLimits::from(&config.upload)));

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server on {}", bind_address);

    let server_result = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .configure(handlers::register_routes)
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {bind_address}"))?
    .run()
    .await;

    tracing::info!("HTTP server stopped, closing broker gateway");
    gateway.close();
    if let Err(e) = correlation_loop.await {
        tracing::error!("Correlation loop task failed: {}", e);
    }
    gateway.flush().await;

    tracing::info!("Image-gateway shut down");
    server_result.context("HTTP server error")
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
