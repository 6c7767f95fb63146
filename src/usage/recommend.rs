//! Rule table that turns usage aggregates into ranked cost-saving suggestions.
//!
//! The multipliers below are product-tuned business heuristics, not derived
//! figures. Tests pin the formulas, not the "correctness" of the numbers.

use serde::{Deserialize, Serialize};

use super::aggregator::Accumulators;
use super::metrics::{avg_tokens_per_request, duplicate_percentage, input_output_ratio};
use super::types::{Category, Impact, Recommendation};

/// Share of premium-model traffic assumed simple enough for a lighter model
pub const LIGHTER_MODEL_TRAFFIC_SHARE: f64 = 0.4;
/// Price reduction when that traffic moves to a lighter model
pub const LIGHTER_MODEL_DISCOUNT: f64 = 0.7;
/// Model-switch suggestions below this estimate are dropped
pub const MIN_MODEL_SWITCH_SAVINGS: f64 = 1.0;
pub const MODEL_SWITCH_HIGH_IMPACT_SHARE: f64 = 0.15;

pub const THINKING_SAVINGS_RATE: f64 = 0.6;
pub const THINKING_HIGH_IMPACT_SHARE: f64 = 0.10;

pub const DUPLICATE_PERCENT_THRESHOLD: f64 = 5.0;
pub const CACHE_SAVINGS_RATE: f64 = 0.8;
pub const DUPLICATE_HIGH_IMPACT_SHARE: f64 = 0.10;

pub const INPUT_OUTPUT_RATIO_THRESHOLD: f64 = 3.0;
pub const PROMPT_TRIM_SAVINGS_RATE: f64 = 0.15;

pub const LONG_CONTEXT_AVG_TOKENS: f64 = 4000.0;
pub const CONTEXT_SAVINGS_RATE: f64 = 0.12;

pub const PEAK_HOURS_REPORTED: usize = 3;
pub const OFF_PEAK_SAVINGS_RATE: f64 = 0.05;

pub const PROMPT_CACHING_SAVINGS_RATE: f64 = 0.25;
pub const CLAUDE_HIGH_IMPACT_SHARE: f64 = 0.30;

pub const STREAMING_MIN_REQUESTS: u64 = 100;
pub const STREAMING_SAVINGS_RATE: f64 = 0.03;

pub const MAX_RECOMMENDATIONS: usize = 6;

/// Substrings (case-insensitive) that classify model names for the model rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelKeywords {
    /// Premium models worth routing away from
    pub expensive: Vec<String>,
    /// Models that support prompt caching
    pub claude: Vec<String>,
}

impl Default for ModelKeywords {
    fn default() -> Self {
        Self {
            expensive: ["gpt-4", "claude-3-opus", "claude-opus", "opus"]
                .into_iter()
                .map(String::from)
                .collect(),
            claude: vec!["claude".to_string()],
        }
    }
}

/// A recommendation before ranking, with its unrounded estimate
#[derive(Debug, Clone)]
struct Candidate {
    title: String,
    description: String,
    savings: f64,
    impact: Impact,
    category: Category,
}

struct RuleContext<'a> {
    acc: &'a Accumulators,
    keywords: &'a ModelKeywords,
    total_cost: f64,
}

type Rule = fn(&RuleContext<'_>) -> Option<Candidate>;

/// Evaluated in this order; ties in savings keep it
const RULES: &[Rule] = &[
    lighter_model_rule,
    extended_thinking_rule,
    duplicate_rule,
    prompt_trim_rule,
    long_context_rule,
    off_peak_rule,
    prompt_caching_rule,
    streaming_rule,
];

/// Run every rule, keep the six largest estimates, and number them from 1
pub fn generate_recommendations(
    acc: &Accumulators,
    keywords: &ModelKeywords,
) -> Vec<Recommendation> {
    let ctx = RuleContext {
        acc,
        keywords,
        total_cost: acc.total_cost,
    };

    rank(RULES.iter().filter_map(|rule| rule(&ctx)).collect())
}

/// Largest estimate first. The sort is stable, so equal estimates keep rule order.
fn rank(mut candidates: Vec<Candidate>) -> Vec<Recommendation> {
    candidates.sort_by(|a, b| b.savings.total_cmp(&a.savings));
    candidates.truncate(MAX_RECOMMENDATIONS);

    candidates
        .into_iter()
        .enumerate()
        .map(|(i, c)| Recommendation {
            title: c.title,
            description: c.description,
            savings: c.savings.max(0.0).round() as u64,
            impact: c.impact,
            category: c.category,
            priority: i + 1,
        })
        .collect()
}

/// Sum of the suggested savings, never more than the total spend
pub fn potential_savings(recommendations: &[Recommendation], total_spent: f64) -> u64 {
    let sum: u64 = recommendations.iter().map(|r| r.savings).sum();
    sum.min(total_spent.max(0.0).round() as u64)
}

fn matches_any(name: &str, keywords: &[String]) -> bool {
    let lower = name.to_lowercase();
    keywords.iter().any(|k| lower.contains(&k.to_lowercase()))
}

/// Cost and names of the models matching `keywords`, costliest first
fn model_group(acc: &Accumulators, keywords: &[String]) -> (f64, Vec<String>) {
    let mut matched: Vec<(&String, f64)> = acc
        .models
        .values()
        .filter(|m| matches_any(&m.name, keywords))
        .map(|m| (&m.name, m.total_cost))
        .collect();
    matched.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let cost: f64 = matched.iter().map(|(_, c)| c).sum();
    let names = matched.into_iter().map(|(n, _)| n.clone()).collect();
    (cost, names)
}

fn share_of(part: f64, total: f64) -> f64 {
    if total > 0.0 {
        part / total * 100.0
    } else {
        0.0
    }
}

fn lighter_model_rule(ctx: &RuleContext<'_>) -> Option<Candidate> {
    let (cost, names) = model_group(ctx.acc, &ctx.keywords.expensive);
    if names.is_empty() {
        return None;
    }

    let savings = cost * LIGHTER_MODEL_TRAFFIC_SHARE * LIGHTER_MODEL_DISCOUNT;
    if savings <= MIN_MODEL_SWITCH_SAVINGS {
        return None;
    }

    let impact = if savings > ctx.total_cost * MODEL_SWITCH_HIGH_IMPACT_SHARE {
        Impact::High
    } else {
        Impact::Medium
    };
    let shown: Vec<&str> = names.iter().take(3).map(String::as_str).collect();

    Some(Candidate {
        title: "Route simple tasks to lighter models".to_string(),
        description: format!(
            "Premium models ({}) cost ${:.2}, {:.0}% of spend. Moving routine prompts to a lighter tier could handle much of that traffic at a fraction of the price.",
            shown.join(", "),
            cost,
            share_of(cost, ctx.total_cost)
        ),
        savings,
        impact,
        category: Category::ModelSelection,
    })
}

fn extended_thinking_rule(ctx: &RuleContext<'_>) -> Option<Candidate> {
    let cost = ctx.acc.extended_thinking_cost;
    if cost <= 0.0 {
        return None;
    }

    let savings = cost * THINKING_SAVINGS_RATE;
    let impact = if savings > ctx.total_cost * THINKING_HIGH_IMPACT_SHARE {
        Impact::High
    } else {
        Impact::Medium
    };

    Some(Candidate {
        title: "Reserve extended thinking for hard problems".to_string(),
        description: format!(
            "{} requests used extended thinking, costing ${:.2}. Turn it off for routine prompts and keep it for complex reasoning.",
            ctx.acc.extended_thinking_count, cost
        ),
        savings,
        impact,
        category: Category::Reasoning,
    })
}

fn duplicate_rule(ctx: &RuleContext<'_>) -> Option<Candidate> {
    let pct = duplicate_percentage(ctx.acc);
    if pct <= DUPLICATE_PERCENT_THRESHOLD {
        return None;
    }

    let dup_cost = ctx.acc.duplicate_cost;
    let impact = if dup_cost > ctx.total_cost * DUPLICATE_HIGH_IMPACT_SHARE {
        Impact::High
    } else {
        Impact::Medium
    };

    Some(Candidate {
        title: "Cache repeated queries".to_string(),
        description: format!(
            "{:.1}% of requests look like repeats (same model and cost), costing ${:.2}. A response cache would avoid most of them.",
            pct, dup_cost
        ),
        savings: dup_cost * CACHE_SAVINGS_RATE,
        impact,
        category: Category::Caching,
    })
}

fn prompt_trim_rule(ctx: &RuleContext<'_>) -> Option<Candidate> {
    let ratio = input_output_ratio(ctx.acc);
    if ratio <= INPUT_OUTPUT_RATIO_THRESHOLD {
        return None;
    }

    Some(Candidate {
        title: "Trim prompt context".to_string(),
        description: format!(
            "Inputs are {:.1}x larger than outputs. Remove redundant context and boilerplate from prompts.",
            ratio
        ),
        savings: ctx.total_cost * PROMPT_TRIM_SAVINGS_RATE,
        impact: Impact::Medium,
        category: Category::PromptOptimization,
    })
}

fn long_context_rule(ctx: &RuleContext<'_>) -> Option<Candidate> {
    let avg = avg_tokens_per_request(ctx.acc);
    if avg <= LONG_CONTEXT_AVG_TOKENS {
        return None;
    }

    Some(Candidate {
        title: "Shorten long conversations".to_string(),
        description: format!(
            "Requests average {:.0} tokens. Summarize history or retrieve only relevant context instead of resending everything.",
            avg
        ),
        savings: ctx.total_cost * CONTEXT_SAVINGS_RATE,
        impact: Impact::Medium,
        category: Category::ContextManagement,
    })
}

fn off_peak_rule(ctx: &RuleContext<'_>) -> Option<Candidate> {
    if ctx.acc.hourly.is_empty() {
        return None;
    }

    let hours = peak_hours(ctx.acc, PEAK_HOURS_REPORTED);
    let labels: Vec<String> = hours.iter().map(|h| format!("{:02}:00", h)).collect();

    Some(Candidate {
        title: "Batch non-urgent work off-peak".to_string(),
        description: format!(
            "Traffic peaks at {} UTC. Move non-urgent jobs to a batch API or quieter hours.",
            labels.join(", ")
        ),
        savings: ctx.total_cost * OFF_PEAK_SAVINGS_RATE,
        impact: Impact::Low,
        category: Category::Scheduling,
    })
}

/// Busiest hours of day by request count, earlier hour first on ties
pub fn peak_hours(acc: &Accumulators, n: usize) -> Vec<u32> {
    let mut hours: Vec<(u32, u64)> = acc.hourly.iter().map(|(h, b)| (*h, b.requests)).collect();
    hours.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    hours.into_iter().take(n).map(|(h, _)| h).collect()
}

fn prompt_caching_rule(ctx: &RuleContext<'_>) -> Option<Candidate> {
    let (cost, names) = model_group(ctx.acc, &ctx.keywords.claude);
    if names.is_empty() {
        return None;
    }

    let impact = if cost > ctx.total_cost * CLAUDE_HIGH_IMPACT_SHARE {
        Impact::High
    } else {
        Impact::Medium
    };

    Some(Candidate {
        title: "Enable prompt caching for Claude".to_string(),
        description: format!(
            "Claude models cost ${:.2}, {:.0}% of spend. Caching repeated system prompts and documents cuts input charges.",
            cost,
            share_of(cost, ctx.total_cost)
        ),
        savings: cost * PROMPT_CACHING_SAVINGS_RATE,
        impact,
        category: Category::Caching,
    })
}

fn streaming_rule(ctx: &RuleContext<'_>) -> Option<Candidate> {
    if ctx.acc.total_requests <= STREAMING_MIN_REQUESTS {
        return None;
    }

    Some(Candidate {
        title: "Adopt streaming responses".to_string(),
        description: format!(
            "Across {} requests, streaming lets you stop unhelpful generations early instead of paying for the full output.",
            ctx.acc.total_requests
        ),
        savings: ctx.total_cost * STREAMING_SAVINGS_RATE,
        impact: Impact::Low,
        category: Category::Streaming,
    })
}
