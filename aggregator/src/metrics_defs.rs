use shared::metrics_defs::{MetricDef, MetricType};

pub const VEHICLES_FETCHED: MetricDef = MetricDef {
    name: "vehicles.fetched",
    metric_type: MetricType::Counter,
    description: "Vehicle records fetched and validated",
};

pub const VEHICLES_FAILED: MetricDef = MetricDef {
    name: "vehicles.failed",
    metric_type: MetricType::Counter,
    description: "Vehicle fetches that degraded to an error record",
};

pub const DEALERS_FETCHED: MetricDef = MetricDef {
    name: "dealers.fetched",
    metric_type: MetricType::Counter,
    description: "Dealer records fetched and validated",
};

pub const DEALERS_FAILED: MetricDef = MetricDef {
    name: "dealers.failed",
    metric_type: MetricType::Counter,
    description: "Dealer fetches that degraded to an error record",
};

pub const MERGE_DURATION: MetricDef = MetricDef {
    name: "merge.duration",
    metric_type: MetricType::Histogram,
    description: "Time to collect and submit a dataset in seconds",
};

pub const ALL_METRICS: &[MetricDef] = &[
    VEHICLES_FETCHED,
    VEHICLES_FAILED,
    DEALERS_FETCHED,
    DEALERS_FAILED,
    MERGE_DURATION,
];
