use shared::metrics_defs::{MetricDef, MetricType};

pub const ACCESS_DENIED: MetricDef = MetricDef {
    name: "access.denied",
    metric_type: MetricType::Counter,
    description: "Preview requests denied by the access check. Tagged with reason.",
};

pub const STORE_ERRORS: MetricDef = MetricDef {
    name: "access.store_errors",
    metric_type: MetricType::Counter,
    description: "Project store lookups that failed and were treated as not found. Tagged with lookup.",
};

pub const ALL_METRICS: &[MetricDef] = &[ACCESS_DENIED, STORE_ERRORS];
