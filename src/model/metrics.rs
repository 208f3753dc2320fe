//! Derived Production Metrics
//!
//! Pure functions turning raw counters into the figures shown on the
//! dashboard: scrap rates, throughput and signed deltas. None of them fail;
//! degenerate input collapses to zero.

/// Seconds in one hour, the throughput reference window.
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Share of scrapped units among everything that left the line, in percent.
pub fn scrap_rate(scrap_total: u64, produced_quantity: u64) -> f64 {
    let all_parts = scrap_total.saturating_add(produced_quantity);
    if all_parts == 0 {
        return 0.0;
    }
    round1(scrap_total as f64 / all_parts as f64 * 100.0)
}

/// Scrap rate across both lines combined.
pub fn average_scrap_rate(total_scrap: u64, total_quantity: u64) -> f64 {
    scrap_rate(total_scrap, total_quantity)
}

/// Throughput extrapolated from the accumulated cycle time of `quantity` parts.
pub fn parts_per_hour(quantity: i64, total_cycle_time_secs: f64) -> u32 {
    if quantity <= 0 || total_cycle_time_secs.is_nan() || total_cycle_time_secs <= 0.0 {
        return 0;
    }
    let seconds_per_part = total_cycle_time_secs / quantity as f64;
    let rate = (SECONDS_PER_HOUR / seconds_per_part).round();
    if rate.is_finite() && rate >= 0.0 {
        rate.min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// Sign-prefixed delta. Zero is rendered as `-0`, matching the line
/// server's historical display.
pub fn format_delta(delta: i64) -> String {
    let sign = if delta > 0 { '+' } else { '-' };
    format!("{}{}", sign, delta.unsigned_abs())
}

/// Whether a delta counts as "ahead" for styling.
pub fn delta_is_positive(delta: i64) -> bool {
    delta > 0
}

/// Percentage text without the `%` suffix; absent or non-finite rates show `0`.
pub fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(r) if r.is_finite() => format!("{}", r),
        _ => "0".to_string(),
    }
}
