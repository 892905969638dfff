use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub trip_transitions_total: IntCounterVec,
    pub trips_active: IntGauge,
    pub trip_distance: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let trip_transitions_total = IntCounterVec::new(
            Opts::new(
                "trip_transitions_total",
                "Trip lifecycle transitions by transition and outcome",
            ),
            &["transition", "outcome"],
        )
        .expect("valid trip_transitions_total metric");

        let trips_active = IntGauge::new("trips_active", "Trips currently in the ACTIVE state")
            .expect("valid trips_active metric");

        let trip_distance = Histogram::with_opts(
            HistogramOpts::new("trip_distance", "Distance of completed trips in odometer units")
                .buckets(vec![
                    10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0,
                ]),
        )
        .expect("valid trip_distance metric");

        registry
            .register(Box::new(trip_transitions_total.clone()))
            .expect("register trip_transitions_total");
        registry
            .register(Box::new(trips_active.clone()))
            .expect("register trips_active");
        registry
            .register(Box::new(trip_distance.clone()))
            .expect("register trip_distance");

        Self {
            registry,
            trip_transitions_total,
            trips_active,
            trip_distance,
        }
    }

    pub fn record_transition(&self, transition: &str, outcome: &str) {
        self.trip_transitions_total
            .with_label_values(&[transition, outcome])
            .inc();
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

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
