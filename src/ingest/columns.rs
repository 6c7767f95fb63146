use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Header synonyms for each canonical field, in lookup order.
pub const COST_COLUMNS: &[&str] = &[
    "cost",
    "total_cost",
    "price",
    "amount",
    "usd",
    "total cost",
    "cost_usd",
    "spend",
];
pub const MODEL_COLUMNS: &[&str] = &["model", "model_name", "model_id", "engine", "model name"];
pub const TOKEN_COLUMNS: &[&str] = &[
    "tokens",
    "total_tokens",
    "token_count",
    "usage",
    "total tokens",
];
pub const INPUT_TOKEN_COLUMNS: &[&str] = &[
    "input_tokens",
    "prompt_tokens",
    "input tokens",
    "tokens_in",
];
pub const OUTPUT_TOKEN_COLUMNS: &[&str] = &[
    "output_tokens",
    "completion_tokens",
    "output tokens",
    "tokens_out",
];
pub const TIMESTAMP_COLUMNS: &[&str] = &[
    "timestamp",
    "date",
    "time",
    "created_at",
    "datetime",
    "created",
    "request_time",
];
pub const DURATION_COLUMNS: &[&str] = &[
    "duration_ms",
    "duration",
    "latency_ms",
    "latency",
    "response_time",
];
pub const THINKING_COLUMNS: &[&str] = &[
    "extended_thinking",
    "thinking",
    "thinking_mode",
    "reasoning",
    "extended thinking",
    "mode",
];

/// Values of the thinking column that mark a request as extended thinking
const THINKING_FLAG_VALUES: &[&str] = &["extended", "true", "yes", "1", "enabled"];

/// Epoch values at or above this are taken as milliseconds
const EPOCH_MILLIS_THRESHOLD: f64 = 1e12;
/// Smallest number accepted as an epoch timestamp (2001-09-09)
const EPOCH_SECONDS_MIN: f64 = 1e9;

/// One CSV line as header/value pairs, in file column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageRow {
    fields: Vec<(String, String)>,
}

impl UsageRow {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    /// Build a row from borrowed pairs (handy in tests)
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// True when every value is empty or whitespace
    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(|(_, v)| v.trim().is_empty())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }
}

/// Whether a raw header names the given candidate column
pub fn header_matches(header: &str, candidate: &str) -> bool {
    header.trim().eq_ignore_ascii_case(candidate.trim())
}

/// Resolve a canonical field from a row.
///
/// Candidates are tried in order; the first header matching a candidate with a
/// non-empty value wins. Returns the trimmed value.
pub fn find_column<'a>(row: &'a UsageRow, candidates: &[&str]) -> Option<&'a str> {
    for candidate in candidates {
        for (header, value) in &row.fields {
            if header_matches(header, candidate) {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value);
                }
            }
        }
    }
    None
}

/// A file needs at least one cost-like or model-like header to be analyzable
pub fn has_required_columns<S: AsRef<str>>(headers: &[S]) -> bool {
    headers.iter().any(|h| {
        let h = h.as_ref();
        COST_COLUMNS
            .iter()
            .chain(MODEL_COLUMNS.iter())
            .any(|c| header_matches(h, c))
    })
}

/// Semantic values resolved from one row. Absent fields simply skip their aggregate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalFields {
    pub cost: Option<f64>,
    pub model: Option<String>,
    pub tokens: Option<u64>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub duration_ms: Option<f64>,
    pub extended_thinking: bool,
}

impl CanonicalFields {
    pub fn from_row(row: &UsageRow) -> Self {
        let input_tokens = find_column(row, INPUT_TOKEN_COLUMNS).and_then(parse_count);
        let output_tokens = find_column(row, OUTPUT_TOKEN_COLUMNS).and_then(parse_count);
        let tokens = find_column(row, TOKEN_COLUMNS)
            .and_then(parse_count)
            .or_else(|| match (input_tokens, output_tokens) {
                (None, None) => None,
                (i, o) => Some(i.unwrap_or(0).saturating_add(o.unwrap_or(0))),
            });

        CanonicalFields {
            cost: find_column(row, COST_COLUMNS).and_then(parse_cost),
            model: find_column(row, MODEL_COLUMNS).map(str::to_string),
            tokens,
            input_tokens,
            output_tokens,
            timestamp: find_column(row, TIMESTAMP_COLUMNS).and_then(parse_timestamp),
            duration_ms: find_column(row, DURATION_COLUMNS).and_then(parse_duration),
            extended_thinking: find_column(row, THINKING_COLUMNS)
                .map(is_thinking_flag)
                .unwrap_or(false),
        }
    }
}

/// Parse a cost cell. Only positive finite amounts count.
pub fn parse_cost(raw: &str) -> Option<f64> {
    let cleaned = raw.trim();
    let cleaned = cleaned.strip_prefix('$').unwrap_or(cleaned).replace(',', "");
    match cleaned.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Some(v),
        _ => None,
    }
}

/// Parse a token count, truncating decimals and rejecting negatives
pub fn parse_count(raw: &str) -> Option<u64> {
    let cleaned = raw.trim().replace(',', "");
    if let Ok(v) = cleaned.parse::<u64>() {
        return Some(v);
    }
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Some(v.trunc() as u64),
        _ => None,
    }
}

/// Parse a duration in milliseconds
pub fn parse_duration(raw: &str) -> Option<f64> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Some(v),
        _ => None,
    }
}

pub fn is_thinking_flag(raw: &str) -> bool {
    let value = raw.trim();
    THINKING_FLAG_VALUES
        .iter()
        .any(|flag| value.eq_ignore_ascii_case(flag))
}

/// Parse the timestamp formats usage exports commonly use. Naive values are UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
    }

    let epoch = s.parse::<f64>().ok().filter(|v| v.is_finite())?;
    if epoch >= EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(epoch as i64)
    } else if epoch >= EPOCH_SECONDS_MIN {
        DateTime::from_timestamp(epoch as i64, 0)
    } else {
        None
    }
}
