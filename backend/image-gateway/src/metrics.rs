use actix_web::HttpResponse;
use prometheus::{Encoder, IntCounter, IntGauge, Opts, TextEncoder};
use tracing::warn;

/// Counters for the reply correlator.
#[derive(Clone)]
pub struct CorrelatorMetrics {
    pub pending: IntGauge,
    pub delivered: IntCounter,
    pub dropped: IntCounter,
    pub timeouts: IntCounter,
}

impl CorrelatorMetrics {
    pub fn new(service: &str) -> Self {
        let registry = prometheus::default_registry();

        let pending = IntGauge::with_opts(
            Opts::new(
                "image_gateway_pending_replies",
                "Number of upload requests currently waiting for a worker reply",
            )
            .const_label("service", service.to_string()),
        )
        .expect("valid metric opts for image_gateway_pending_replies");

        let delivered = IntCounter::with_opts(
            Opts::new(
                "image_gateway_replies_delivered_total",
                "Total number of worker replies handed to a waiting request",
            )
            .const_label("service", service.to_string()),
        )
        .expect("valid metric opts for image_gateway_replies_delivered_total");

        let dropped = IntCounter::with_opts(
            Opts::new(
                "image_gateway_replies_dropped_total",
                "Total number of worker replies dropped because no request was waiting",
            )
            .const_label("service", service.to_string()),
        )
        .expect("valid metric opts for image_gateway_replies_dropped_total");

        let timeouts = IntCounter::with_opts(
            Opts::new(
                "image_gateway_reply_timeouts_total",
                "Total number of upload requests that gave up waiting for a reply",
            )
            .const_label("service", service.to_string()),
        )
        .expect("valid metric opts for image_gateway_reply_timeouts_total");

        for metric in [
            Box::new(pending.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(delivered.clone()),
            Box::new(dropped.clone()),
            Box::new(timeouts.clone()),
        ] {
            if let Err(e) = registry.register(metric) {
                warn!("Failed to register correlator metric: {}", e);
            }
        }

        Self {
            pending,
            delivered,
            dropped,
            timeouts,
        }
    }
}

/// `GET /metrics`: the default registry in the Prometheus text format
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
