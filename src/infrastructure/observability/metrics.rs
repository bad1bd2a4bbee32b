// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// 初始化指标系统
///
/// 配置并注册应用所需的各类监控指标
pub fn init_metrics() {
    let builder = PrometheusBuilder::new();
    builder
        .install()
        .expect("failed to install Prometheus recorder");

    // Register metrics
    describe_counter!("import_pages_total", "Total number of API pages fetched");
    describe_counter!(
        "import_checkins_queued_total",
        "Total number of checkins handed to the batch scheduler"
    );
    describe_counter!(
        "import_errors_total",
        "Total number of import runs that ended in error"
    );
    describe_counter!("jobs_completed_total", "Total number of jobs completed");
    describe_counter!("jobs_failed_total", "Total number of jobs failed");
    describe_counter!(
        "jobs_deferred_total",
        "Total number of jobs deferred for lack of budget"
    );
    describe_gauge!(
        "api_budget_remaining",
        "Budget units left in the current window"
    );
}
