use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-model usage entry as shown on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelUsage {
    /// Display name, shortened for charts
    pub name: String,
    /// Model name exactly as it appeared in the CSV (trimmed)
    pub full_name: String,
    pub requests: u64,
    pub cost: f64,
    pub tokens: u64,
    /// Share of requests that named a model, in whole percent
    pub usage: u32,
    pub color: String,
}

/// One weekday bucket of the weekly usage chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayUsage {
    pub day: String,
    pub requests: u64,
    pub cost: f64,
}

/// Extended thinking usage summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedThinkingSummary {
    pub count: u64,
    pub cost: f64,
    pub percentage: f64,
}

/// Derived per-request metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetrics {
    pub avg_cost_per_request: f64,
    pub avg_tokens_per_request: f64,
    /// Average request duration in milliseconds
    pub avg_duration: f64,
    pub duplicate_count: u64,
    pub duplicate_percentage: f64,
    pub duplicate_cost: f64,
    pub input_output_ratio: f64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
}

/// Granularity of the inferred reporting period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodUnit {
    Days,
    Weeks,
    Months,
}

impl PeriodUnit {
    /// Number of days one unit stands for
    pub fn days(&self) -> u64 {
        match self {
            PeriodUnit::Days => 1,
            PeriodUnit::Weeks => 7,
            PeriodUnit::Months => 30,
        }
    }
}

/// Reporting period inferred from the earliest and latest timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePeriod {
    pub value: u64,
    pub unit: PeriodUnit,
    pub label: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl TimePeriod {
    /// Approximate length of the period in days, used for per-day averages
    pub fn days_in_period(&self) -> u64 {
        (self.value * self.unit.days()).max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    Medium,
    Low,
}

impl Impact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::High => "high",
            Impact::Medium => "medium",
            Impact::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    ModelSelection,
    Reasoning,
    Caching,
    PromptOptimization,
    ContextManagement,
    Scheduling,
    Streaming,
}

/// A cost-saving suggestion with its estimated monthly impact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    /// Estimated savings in whole currency units
    pub savings: u64,
    pub impact: Impact,
    pub category: Category,
    /// 1-based rank after sorting by savings
    pub priority: usize,
}

/// Complete output of one analysis run.
///
/// Produced once per upload and never updated in place; a new analysis replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub total_spent: f64,
    pub total_requests: u64,
    pub total_tokens: u64,
    pub files_analyzed: usize,
    pub potential_savings: u64,
    pub models: Vec<ModelUsage>,
    pub weekly_usage: Vec<DayUsage>,
    pub extended_thinking: ExtendedThinkingSummary,
    pub metrics: UsageMetrics,
    pub time_period: Option<TimePeriod>,
    pub recommendations: Vec<Recommendation>,
}

impl AnalysisResult {
    /// Days covered by the analysis, defaulting to a week when no timestamps were seen
    pub fn days_in_period(&self) -> u64 {
        self.time_period
            .as_ref()
            .map(|p| p.days_in_period())
            .unwrap_or(7)
    }

    /// Weekday with the most requests
    pub fn busiest_day(&self) -> Option<&DayUsage> {
        self.weekly_usage
            .iter()
            .fold(None, |best: Option<&DayUsage>, day| match best {
                Some(b) if b.requests >= day.requests => Some(b),
                _ => Some(day),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(name: &str, requests: u64) -> DayUsage {
        DayUsage {
            day: name.to_string(),
            requests,
            cost: 0.0,
        }
    }

    #[test]
    fn test_days_in_period_by_unit() {
        let start = Utc::now();
        let period = TimePeriod {
            value: 2,
            unit: PeriodUnit::Weeks,
            label: "2 weeks".to_string(),
            start_date: start,
            end_date: start,
        };
        assert_eq!(period.days_in_period(), 14);
    }

    #[test]
    fn test_busiest_day_prefers_first_on_tie() {
        let result = AnalysisResult {
            total_spent: 0.0,
            total_requests: 0,
            total_tokens: 0,
            files_analyzed: 0,
            potential_savings: 0,
            models: Vec::new(),
            weekly_usage: vec![day("Mon", 5), day("Tue", 9), day("Wed", 9)],
            extended_thinking: ExtendedThinkingSummary::default(),
            metrics: UsageMetrics::default(),
            time_period: None,
            recommendations: Vec::new(),
        };
        assert_eq!(result.busiest_day().map(|d| d.day.as_str()), Some("Tue"));
        assert_eq!(result.days_in_period(), 7);
    }

    #[test]
    fn test_enums_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Impact::High).unwrap(), "\"high\"");
        assert_eq!(
            serde_json::to_string(&Category::PromptOptimization).unwrap(),
            "\"prompt-optimization\""
        );
        assert_eq!(serde_json::to_string(&PeriodUnit::Weeks).unwrap(), "\"weeks\"");
    }
}
