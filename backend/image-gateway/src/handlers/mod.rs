/// HTTP handlers for image-gateway
///
/// - Uploads: `POST /upload`, multipart images in, HTML fragments out
/// - Health: liveness and readiness probes
pub mod health;
pub mod uploads;

use actix_web::web;

pub use health::{health, live, ready};
pub use uploads::upload_images;

/// Register every route. Methods other than POST on `/upload` get 405.
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/upload").route(web::post().to(upload_images)))
        .route("/api/v1/health", web::get().to(health))
        .route("/api/v1/health/live", web::get().to(live))
        .route("/api/v1/health/ready", web::get().to(ready))
        .route("/metrics", web::get().to(crate::metrics::serve_metrics));
}
