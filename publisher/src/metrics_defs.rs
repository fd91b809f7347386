//! Metric definitions for the publisher.

#[derive(Debug, Clone, Copy)]
pub struct MetricDef {
    pub name: &'static str,
    pub description: &'static str,
}

pub const PUBLISH_REQUESTS: MetricDef = MetricDef {
    name: "publish.requests",
    description: "Publish requests received, before validation",
};

pub const PUBLISH_SUCCESS: MetricDef = MetricDef {
    name: "publish.success",
    description: "Payloads successfully written to the repository",
};

pub const PUBLISH_FAILED: MetricDef = MetricDef {
    name: "publish.failed",
    description: "Failed requests. Tagged with status.",
};

pub const ALL_METRICS: &[MetricDef] = &[PUBLISH_REQUESTS, PUBLISH_SUCCESS, PUBLISH_FAILED];
