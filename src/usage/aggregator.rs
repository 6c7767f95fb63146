use chrono::{DateTime, NaiveDate, Timelike, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use crate::ingest::{CanonicalFields, UsageRow};

/// Running totals for one distinct model name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelAggregate {
    pub name: String,
    pub request_count: u64,
    pub total_cost: f64,
    pub total_tokens: u64,
}

/// Requests and cost falling into one day or one hour-of-day
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeBucket {
    pub requests: u64,
    pub cost: f64,
}

/// Everything the single pass over the rows produces
#[derive(Debug, Clone, Default)]
pub struct Accumulators {
    pub total_requests: u64,
    pub total_cost: f64,
    pub total_tokens: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    /// Keyed by the model string exactly as resolved (trimmed only)
    pub models: HashMap<String, ModelAggregate>,
    pub requests_with_model: u64,
    pub extended_thinking_count: u64,
    pub extended_thinking_cost: f64,
    pub duration_sum_ms: f64,
    pub duration_count: u64,
    pub daily: BTreeMap<NaiveDate, TimeBucket>,
    /// Hour of day (0-23, UTC) to bucket
    pub hourly: BTreeMap<u32, TimeBucket>,
    pub min_timestamp: Option<DateTime<Utc>>,
    pub max_timestamp: Option<DateTime<Utc>>,
    pub duplicate_count: u64,
    pub duplicate_cost: f64,
}

/// Coarse `(model, cost in tenths of a cent)` key used to spot repeated requests.
pub type DuplicateSignature = (String, i64);

/// Heuristic stand-in for "the same request was sent twice".
///
/// Two distinct requests to the same model whose costs round to the same tenth
/// of a cent collide (false positive), and identical requests whose costs differ
/// by floating-point jitter across that boundary do not (false negative).
pub fn approximate_duplicate_signature(model: Option<&str>, cost: f64) -> DuplicateSignature {
    (
        model.unwrap_or_default().to_string(),
        (cost * 1000.0).round() as i64,
    )
}

/// Single-pass accumulator over canonicalized rows
#[derive(Debug, Default)]
pub struct RowAggregator {
    acc: Accumulators,
    seen: HashSet<DuplicateSignature>,
}

impl RowAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one row into the running totals
    pub fn push(&mut self, fields: &CanonicalFields) {
        let acc = &mut self.acc;
        acc.total_requests += 1;

        // A cost that would push the total past f64 range is treated as absent
        let valid_cost = fields
            .cost
            .filter(|c| (acc.total_cost + c).is_finite());
        if valid_cost.is_none() && fields.cost.is_some() {
            debug!(cost = ?fields.cost, "dropping cost that overflows the running total");
        }
        let cost = valid_cost.unwrap_or(0.0);
        acc.total_cost += cost;

        if let Some(tokens) = fields.tokens {
            acc.total_tokens = acc.total_tokens.saturating_add(tokens);
        }
        if let Some(input) = fields.input_tokens {
            acc.total_input_tokens = acc.total_input_tokens.saturating_add(input);
        }
        if let Some(output) = fields.output_tokens {
            acc.total_output_tokens = acc.total_output_tokens.saturating_add(output);
        }

        if let Some(model) = fields.model.as_deref() {
            let entry = acc
                .models
                .entry(model.to_string())
                .or_insert_with(|| ModelAggregate {
                    name: model.to_string(),
                    ..Default::default()
                });
            entry.request_count += 1;
            entry.total_cost += cost;
            entry.total_tokens = entry
                .total_tokens
                .saturating_add(fields.tokens.unwrap_or(0));
            acc.requests_with_model += 1;
        }

        if fields.extended_thinking {
            acc.extended_thinking_count += 1;
            acc.extended_thinking_cost += cost;
        }

        if let Some(duration) = fields.duration_ms {
            acc.duration_sum_ms += duration;
            acc.duration_count += 1;
        }

        if let Some(ts) = fields.timestamp {
            let day = acc.daily.entry(ts.date_naive()).or_default();
            day.requests += 1;
            day.cost += cost;

            let hour = acc.hourly.entry(ts.hour()).or_default();
            hour.requests += 1;
            hour.cost += cost;

            acc.min_timestamp = Some(acc.min_timestamp.map_or(ts, |m| m.min(ts)));
            acc.max_timestamp = Some(acc.max_timestamp.map_or(ts, |m| m.max(ts)));
        }

        if let Some(cost) = valid_cost {
            let signature = approximate_duplicate_signature(fields.model.as_deref(), cost);
            if !self.seen.insert(signature) {
                acc.duplicate_count += 1;
                acc.duplicate_cost += cost;
            }
        }
    }

    pub fn finish(self) -> Accumulators {
        self.acc
    }
}

/// Resolve and accumulate every row in one pass
pub fn aggregate_rows(rows: &[UsageRow]) -> Accumulators {
    let mut aggregator = RowAggregator::new();
    for row in rows {
        aggregator.push(&CanonicalFields::from_row(row));
    }
    aggregator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> UsageRow {
        UsageRow::from_pairs(pairs)
    }

    #[test]
    fn test_aggregate_empty() {
        let acc = aggregate_rows(&[]);
        assert_eq!(acc.total_requests, 0);
        assert!(acc.models.is_empty());
        assert!(acc.min_timestamp.is_none());
    }

    #[test]
    fn test_aggregate_models_and_duplicates() {
        let rows = vec![
            row(&[("model", "GPT-4"), ("cost", "10.00")]),
            row(&[("model", "GPT-4"), ("cost", "10.00")]),
            row(&[("model", "Claude"), ("cost", "5.00")]),
        ];
        let acc = aggregate_rows(&rows);

        assert_eq!(acc.total_requests, 3);
        assert!((acc.total_cost - 25.0).abs() < 1e-9);
        assert_eq!(acc.models["GPT-4"].request_count, 2);
        assert!((acc.models["GPT-4"].total_cost - 20.0).abs() < 1e-9);
        assert_eq!(acc.models["Claude"].request_count, 1);
        assert_eq!(acc.duplicate_count, 1);
        assert!((acc.duplicate_cost - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_model_names_are_case_sensitive() {
        let rows = vec![
            row(&[("model", "gpt-4"), ("cost", "1")]),
            row(&[("model", "GPT-4"), ("cost", "1")]),
        ];
        let acc = aggregate_rows(&rows);
        assert_eq!(acc.models.len(), 2);
        // Different model keys, so no duplicate either
        assert_eq!(acc.duplicate_count, 0);
    }

    #[test]
    fn test_duplicate_signature_rounds_to_tenth_of_cent() {
        assert_eq!(
            approximate_duplicate_signature(Some("m"), 0.0123),
            approximate_duplicate_signature(Some("m"), 0.0121)
        );
        assert_ne!(
            approximate_duplicate_signature(Some("m"), 0.0123),
            approximate_duplicate_signature(Some("m"), 0.0131)
        );
    }

    #[test]
    fn test_bad_cost_keeps_other_fields() {
        let rows = vec![row(&[
            ("model", "gpt-4"),
            ("cost", "oops"),
            ("tokens", "100"),
            ("timestamp", "2026-01-05T10:00:00Z"),
        ])];
        let acc = aggregate_rows(&rows);
        assert_eq!(acc.total_requests, 1);
        assert_eq!(acc.total_cost, 0.0);
        assert_eq!(acc.total_tokens, 100);
        assert_eq!(acc.models["gpt-4"].request_count, 1);
        assert_eq!(acc.daily.len(), 1);
        assert_eq!(acc.duplicate_count, 0);
    }

    #[test]
    fn test_extended_thinking_and_time_buckets() {
        let rows = vec![
            row(&[
                ("model", "claude-sonnet"),
                ("cost", "2.00"),
                ("thinking", "Extended"),
                ("timestamp", "2026-01-05T09:15:00Z"),
            ]),
            row(&[
                ("model", "claude-sonnet"),
                ("cost", "1.50"),
                ("thinking", "standard"),
                ("timestamp", "2026-01-07T09:45:00Z"),
            ]),
        ];
        let acc = aggregate_rows(&rows);

        assert_eq!(acc.extended_thinking_count, 1);
        assert!((acc.extended_thinking_cost - 2.0).abs() < 1e-9);
        assert_eq!(acc.daily.len(), 2);
        assert_eq!(acc.hourly.len(), 1);
        assert_eq!(acc.hourly[&9].requests, 2);
        assert!(acc.min_timestamp < acc.max_timestamp);
    }

    #[test]
    fn test_duration_tracking() {
        let rows = vec![
            row(&[("model", "a"), ("duration_ms", "100")]),
            row(&[("model", "a"), ("duration_ms", "300")]),
            row(&[("model", "a")]),
        ];
        let acc = aggregate_rows(&rows);
        assert_eq!(acc.duration_count, 2);
        assert!((acc.duration_sum_ms - 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_huge_token_counts_saturate() {
        let rows = vec![
            row(&[("model", "a"), ("tokens", "1e20"), ("input_tokens", "1e20")]),
            row(&[("model", "a"), ("tokens", "1e20"), ("input_tokens", "1e20")]),
        ];
        let acc = aggregate_rows(&rows);
        assert_eq!(acc.total_requests, 2);
        assert_eq!(acc.total_tokens, u64::MAX);
        assert_eq!(acc.total_input_tokens, u64::MAX);
        assert_eq!(acc.models["a"].total_tokens, u64::MAX);
    }

    #[test]
    fn test_cost_overflowing_total_is_dropped() {
        let rows = vec![
            row(&[("model", "a"), ("cost", "1e308")]),
            row(&[("model", "b"), ("cost", "1e308")]),
            row(&[("model", "c"), ("cost", "2.50")]),
        ];
        let acc = aggregate_rows(&rows);
        assert_eq!(acc.total_requests, 3);
        assert!(acc.total_cost.is_finite());
        assert_eq!(acc.total_cost, 1e308);
        assert_eq!(acc.models["b"].request_count, 1);
        assert_eq!(acc.models["b"].total_cost, 0.0);
    }
}
