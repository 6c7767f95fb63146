pub mod aggregator;
pub mod metrics;
pub mod recommend;
pub mod types;

pub use recommend::ModelKeywords;
pub use types::*;

use tracing::debug;

use crate::ingest::UsageRow;
use aggregator::{aggregate_rows, Accumulators, ModelAggregate};
use metrics::{
    extended_thinking_summary, round2, synthesize_metrics, time_period, weekly_usage,
};
use recommend::{generate_recommendations, potential_savings};

/// Default number of models kept for display
pub const DEFAULT_TOP_MODELS: usize = 8;

/// Chart colors assigned by rank
pub const MODEL_PALETTE: [&str; 8] = [
    "#F97CF5", "#A855F7", "#8B5CF6", "#6366F1", "#3B82F6", "#06B6D4", "#10B981", "#F59E0B",
];

const MAX_DISPLAY_NAME_CHARS: usize = 15;

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub top_models: usize,
    pub keywords: ModelKeywords,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            top_models: DEFAULT_TOP_MODELS,
            keywords: ModelKeywords::default(),
        }
    }
}

/// Aggregate rows, derive metrics and recommendations, and assemble the result
pub fn analyze(rows: &[UsageRow], files_analyzed: usize, options: &AnalysisOptions) -> AnalysisResult {
    let acc = aggregate_rows(rows);
    debug!(
        rows = rows.len(),
        models = acc.models.len(),
        dated_days = acc.daily.len(),
        "aggregated usage rows"
    );

    let recommendations = generate_recommendations(&acc, &options.keywords);
    let total_spent = round2(acc.total_cost);

    AnalysisResult {
        total_spent,
        total_requests: acc.total_requests,
        total_tokens: acc.total_tokens,
        files_analyzed,
        potential_savings: potential_savings(&recommendations, total_spent),
        models: display_models(&acc, options.top_models),
        weekly_usage: weekly_usage(&acc),
        extended_thinking: extended_thinking_summary(&acc),
        metrics: synthesize_metrics(&acc),
        time_period: time_period(&acc),
        recommendations,
    }
}

/// Rank models by requests, then cost, then name, and decorate them for charts
pub fn display_models(acc: &Accumulators, limit: usize) -> Vec<ModelUsage> {
    let mut models: Vec<&ModelAggregate> = acc.models.values().collect();
    models.sort_by(|a, b| {
        b.request_count
            .cmp(&a.request_count)
            .then_with(|| b.total_cost.total_cmp(&a.total_cost))
            .then_with(|| a.name.cmp(&b.name))
    });

    let with_model = acc.requests_with_model as f64;
    models
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(rank, m)| ModelUsage {
            name: display_name(&m.name),
            full_name: m.name.clone(),
            requests: m.request_count,
            cost: round2(m.total_cost),
            tokens: m.total_tokens,
            usage: metrics::safe_div(m.request_count as f64 * 100.0, with_model).round() as u32,
            color: MODEL_PALETTE[rank % MODEL_PALETTE.len()].to_string(),
        })
        .collect()
}

/// Shorten long model names for chart labels
pub fn display_name(name: &str) -> String {
    if name.chars().count() > MAX_DISPLAY_NAME_CHARS {
        let head: String = name.chars().take(MAX_DISPLAY_NAME_CHARS).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}
