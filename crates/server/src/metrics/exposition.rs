use std::fmt::Write;
use std::sync::Arc;

use super::server_metrics::ServerMetrics;

pub fn render_prometheus(m: &Arc<ServerMetrics>) -> String {
    let mut out = String::with_capacity(512);

    write_counter(&mut out, "vigil_server_rule_status_requests_total", m.rule_requests_total());
    write_counter(&mut out, "vigil_server_alert_status_requests_total", m.alert_requests_total());
    write_counter(&mut out, "vigil_server_bad_data_errors_total", m.bad_data_total());
    write_counter(&mut out, "vigil_server_server_errors_total", m.server_errors_total());

    let (sum, count) = m.rule_latency_vals();
    write_summary(&mut out, "vigil_server_rule_status_latency_us", sum, count);

    out
}

fn write_counter(out: &mut String, name: &str, val: u64) {
    let _ = writeln!(out, "# TYPE {name} counter");
    let _ = writeln!(out, "{name} {val}");
}

fn write_summary(out: &mut String, name: &str, sum: u64, count: u64) {
    let _ = writeln!(out, "# TYPE {name} summary");
    let _ = writeln!(out, "{name}_sum {sum}");
    let _ = writeln!(out, "{name}_count {count}");
}
