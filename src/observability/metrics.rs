use prometheus::{
    Encoder, GaugeVec, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub notifications_total: IntCounterVec,
    pub fixes_in_queue: IntGauge,
    pub fix_scan_seconds: HistogramVec,
    pub user_score: GaugeVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let notifications_total = IntCounterVec::new(
            Opts::new(
                "notifications_total",
                "Total nearby notifications by outcome",
            ),
            &["outcome"],
        )
        .expect("valid notifications_total metric");

        let fixes_in_queue = IntGauge::new(
            "fixes_in_queue",
            "Current number of location fixes in the feed queue",
        )
        .expect("valid fixes_in_queue metric");

        let fix_scan_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "fix_scan_seconds",
                "Latency of a per-fix proximity scan in seconds",
            ),
            &["result"],
        )
        .expect("valid fix_scan_seconds metric");

        let user_score = GaugeVec::new(
            Opts::new("user_score", "Current score per user"),
            &["user_id"],
        )
        .expect("valid user_score metric");

        registry
            .register(Box::new(notifications_total.clone()))
            .expect("register notifications_total");
        registry
            .register(Box::new(fixes_in_queue.clone()))
            .expect("register fixes_in_queue");
        registry
            .register(Box::new(fix_scan_seconds.clone()))
            .expect("register fix_scan_seconds");
        registry
            .register(Box::new(user_score.clone()))
            .expect("register user_score");

        Self {
            registry,
            notifications_total,
            fixes_in_queue,
            fix_scan_seconds,
            user_score,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
