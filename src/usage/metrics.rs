use chrono::{DateTime, Datelike, Utc};

use super::aggregator::Accumulators;
use super::types::{DayUsage, ExtendedThinkingSummary, PeriodUnit, TimePeriod, UsageMetrics};

pub const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Share of a typical week's traffic per weekday, Mon..Sun.
/// Used when the data has too few dated days to chart a real week.
pub const FALLBACK_WEEKLY_DISTRIBUTION: [f64; 7] = [0.14, 0.17, 0.16, 0.18, 0.16, 0.11, 0.08];

/// Fewer distinct dates than this falls back to the fixed distribution
const MIN_DATED_DAYS: usize = 2;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Division that yields 0 for an empty denominator
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() < f64::EPSILON {
        0.0
    } else {
        numerator / denominator
    }
}

/// Round half away from zero. Values too large to scale are already whole.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

/// Turn raw accumulators into display metrics
pub fn synthesize_metrics(acc: &Accumulators) -> UsageMetrics {
    let requests = acc.total_requests as f64;

    UsageMetrics {
        avg_cost_per_request: round_to(safe_div(acc.total_cost, requests), 4),
        avg_tokens_per_request: round2(safe_div(acc.total_tokens as f64, requests)),
        avg_duration: round2(safe_div(acc.duration_sum_ms, acc.duration_count as f64)),
        duplicate_count: acc.duplicate_count,
        duplicate_percentage: round2(duplicate_percentage(acc)),
        duplicate_cost: round2(acc.duplicate_cost),
        input_output_ratio: round2(input_output_ratio(acc)),
        total_input_tokens: acc.total_input_tokens,
        total_output_tokens: acc.total_output_tokens,
    }
}

pub fn duplicate_percentage(acc: &Accumulators) -> f64 {
    safe_div(acc.duplicate_count as f64, acc.total_requests as f64) * 100.0
}

pub fn input_output_ratio(acc: &Accumulators) -> f64 {
    if acc.total_output_tokens == 0 {
        0.0
    } else {
        acc.total_input_tokens as f64 / acc.total_output_tokens as f64
    }
}

pub fn avg_tokens_per_request(acc: &Accumulators) -> f64 {
    safe_div(acc.total_tokens as f64, acc.total_requests as f64)
}

pub fn extended_thinking_summary(acc: &Accumulators) -> ExtendedThinkingSummary {
    ExtendedThinkingSummary {
        count: acc.extended_thinking_count,
        cost: round2(acc.extended_thinking_cost),
        percentage: round2(
            safe_div(
                acc.extended_thinking_count as f64,
                acc.total_requests as f64,
            ) * 100.0,
        ),
    }
}

/// Reporting period from the observed timestamp range, if any timestamps parsed
pub fn time_period(acc: &Accumulators) -> Option<TimePeriod> {
    match (acc.min_timestamp, acc.max_timestamp) {
        (Some(start), Some(end)) => Some(classify_time_period(start, end)),
        _ => None,
    }
}

/// Classify a span: up to a day, up to a week in days, up to 60 days in weeks,
/// beyond that in months. Values use round-half-up.
pub fn classify_time_period(start: DateTime<Utc>, end: DateTime<Utc>) -> TimePeriod {
    let days = (end - start).num_milliseconds() as f64 / MILLIS_PER_DAY;

    let (value, unit) = if days <= 1.0 {
        (1.0, PeriodUnit::Days)
    } else if days <= 7.0 {
        (days.round(), PeriodUnit::Days)
    } else if days <= 60.0 {
        // 8-14 days rounds to one or two weeks, same formula as longer spans
        ((days / 7.0).round(), PeriodUnit::Weeks)
    } else {
        ((days / 30.0).round(), PeriodUnit::Months)
    };
    let value = (value as u64).max(1);

    TimePeriod {
        value,
        unit,
        label: period_label(value, unit),
        start_date: start,
        end_date: end,
    }
}

fn period_label(value: u64, unit: PeriodUnit) -> String {
    let noun = match unit {
        PeriodUnit::Days => "day",
        PeriodUnit::Weeks => "week",
        PeriodUnit::Months => "month",
    };
    if value == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", value, noun)
    }
}

/// Seven Mon..Sun buckets, from real dated rows when there are enough of them
pub fn weekly_usage(acc: &Accumulators) -> Vec<DayUsage> {
    if acc.daily.len() >= MIN_DATED_DAYS {
        real_weekly_usage(acc)
    } else {
        fallback_weekly_usage(acc.total_requests, acc.total_cost)
    }
}

/// Average each weekday across the calendar dates that fell on it
fn real_weekly_usage(acc: &Accumulators) -> Vec<DayUsage> {
    let mut requests = [0u64; 7];
    let mut cost = [0f64; 7];
    let mut dates = [0u32; 7];

    for (date, bucket) in &acc.daily {
        let idx = date.weekday().num_days_from_monday() as usize;
        requests[idx] += bucket.requests;
        cost[idx] += bucket.cost;
        dates[idx] += 1;
    }

    WEEKDAY_LABELS
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let n = dates[i] as f64;
            DayUsage {
                day: label.to_string(),
                requests: safe_div(requests[i] as f64, n).round() as u64,
                cost: round2(safe_div(cost[i], n)),
            }
        })
        .collect()
}

/// Spread totals over a typical week
pub fn fallback_weekly_usage(total_requests: u64, total_cost: f64) -> Vec<DayUsage> {
    WEEKDAY_LABELS
        .iter()
        .zip(FALLBACK_WEEKLY_DISTRIBUTION.iter())
        .map(|(label, share)| DayUsage {
            day: label.to_string(),
            requests: (total_requests as f64 * share).round() as u64,
            cost: round2(total_cost * share),
        })
        .collect()
}
