use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ExportError;
use crate::usage::{AnalysisResult, DayUsage, ModelUsage, Recommendation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub total_spent: f64,
    pub potential_savings: u64,
    pub total_requests: u64,
    pub files_analyzed: usize,
}

/// Downloadable JSON report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub generated_at: DateTime<Utc>,
    pub summary: ExportSummary,
    pub models: Vec<ModelUsage>,
    pub recommendations: Vec<Recommendation>,
    pub weekly_usage: Vec<DayUsage>,
}

impl ExportDocument {
    pub fn from_analysis(analysis: &AnalysisResult, generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at,
            summary: ExportSummary {
                total_spent: analysis.total_spent,
                potential_savings: analysis.potential_savings,
                total_requests: analysis.total_requests,
                files_analyzed: analysis.files_analyzed,
            },
            models: analysis.models.clone(),
            recommendations: analysis.recommendations.clone(),
            weekly_usage: analysis.weekly_usage.clone(),
        }
    }
}

pub fn render(analysis: &AnalysisResult, generated_at: DateTime<Utc>) -> Result<Vec<u8>, ExportError> {
    let doc = ExportDocument::from_analysis(analysis, generated_at);
    Ok(serde_json::to_vec_pretty(&doc)?)
}
