use chrono::{DateTime, Utc};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use super::ExportError;
use crate::usage::AnalysisResult;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const VALUE_COLUMN: f32 = 80.0;
/// Characters per wrapped body line at body size on A4
const WRAP_CHARS: usize = 95;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Title,
    Heading,
    Body,
    Muted,
}

impl LineStyle {
    fn size(&self) -> f32 {
        match self {
            LineStyle::Title => 22.0,
            LineStyle::Heading => 15.0,
            LineStyle::Body | LineStyle::Muted => 10.0,
        }
    }

    /// Vertical space consumed, in millimetres
    fn advance(&self) -> f32 {
        match self {
            LineStyle::Title => 12.0,
            LineStyle::Heading => 9.0,
            LineStyle::Body | LineStyle::Muted => 5.5,
        }
    }
}

/// One laid-out line of the report. `value` renders in a second column.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub style: LineStyle,
    pub text: String,
    pub value: Option<String>,
    pub indent: f32,
}

impl ReportLine {
    fn new(style: LineStyle, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
            value: None,
            indent: 0.0,
        }
    }

    fn pair(label: &str, value: String) -> Self {
        Self {
            style: LineStyle::Body,
            text: label.to_string(),
            value: Some(value),
            indent: 0.0,
        }
    }

    fn indented(mut self, indent: f32) -> Self {
        self.indent = indent;
        self
    }

    fn gap() -> Self {
        Self::new(LineStyle::Body, "")
    }
}

/// Lay out the report content top to bottom
pub fn report_lines(analysis: &AnalysisResult, generated_at: DateTime<Utc>) -> Vec<ReportLine> {
    let mut lines = vec![
        ReportLine::new(LineStyle::Title, "AI Usage Report"),
        ReportLine::new(
            LineStyle::Muted,
            format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M UTC")),
        ),
        ReportLine::gap(),
        ReportLine::new(LineStyle::Heading, "Executive Summary"),
        ReportLine::pair("Total Spent", format!("${:.2}", analysis.total_spent)),
        ReportLine::pair(
            "Potential Savings",
            format!("${}/mo", analysis.potential_savings),
        ),
        ReportLine::pair("Total Requests", analysis.total_requests.to_string()),
        ReportLine::pair("Files Analyzed", analysis.files_analyzed.to_string()),
        ReportLine::pair(
            "Time Period",
            analysis
                .time_period
                .as_ref()
                .map(|p| {
                    format!(
                        "{} ({} to {})",
                        p.label,
                        p.start_date.format("%Y-%m-%d"),
                        p.end_date.format("%Y-%m-%d")
                    )
                })
                .unwrap_or_else(|| "Unknown".to_string()),
        ),
        ReportLine::pair(
            "Avg Cost / Request",
            format!("${:.4}", analysis.metrics.avg_cost_per_request),
        ),
        ReportLine::gap(),
        ReportLine::new(LineStyle::Heading, "Models"),
    ];

    if analysis.models.is_empty() {
        lines.push(ReportLine::new(LineStyle::Muted, "No model data"));
    }
    for (i, m) in analysis.models.iter().enumerate() {
        lines.push(ReportLine::new(
            LineStyle::Body,
            format!(
                "{}. {}: {} requests, ${:.2} ({}%)",
                i + 1,
                m.full_name,
                m.requests,
                m.cost,
                m.usage
            ),
        ));
    }

    lines.push(ReportLine::gap());
    lines.push(ReportLine::new(LineStyle::Heading, "Recommendations"));
    if analysis.recommendations.is_empty() {
        lines.push(ReportLine::new(
            LineStyle::Muted,
            "No recommendations for this dataset",
        ));
    }
    for rec in &analysis.recommendations {
        lines.push(ReportLine::new(
            LineStyle::Body,
            format!(
                "{}. {} [{}] +${}/mo",
                rec.priority,
                rec.title,
                rec.impact.as_str().to_uppercase(),
                rec.savings
            ),
        ));
        for chunk in wrap_text(&rec.description, WRAP_CHARS) {
            lines.push(ReportLine::new(LineStyle::Muted, chunk).indented(5.0));
        }
    }

    lines
}

/// Greedy word wrap on character count
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self, ExportError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ExportError::Pdf(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ExportError::Pdf(e.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
        })
    }

    fn new_page(&mut self) {
        self.pages += 1;
        let (page, layer) = self.doc.add_page(
            Mm(PAGE_WIDTH),
            Mm(PAGE_HEIGHT),
            format!("Layer {}", self.pages),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn write(&mut self, line: &ReportLine) {
        let advance = line.style.advance();
        if self.y - advance < MARGIN {
            self.new_page();
        }
        self.y -= advance;
        if line.text.is_empty() {
            return;
        }

        let font = match line.style {
            LineStyle::Title | LineStyle::Heading => &self.bold,
            LineStyle::Body | LineStyle::Muted => &self.regular,
        };
        let size = line.style.size();
        self.layer.use_text(
            line.text.clone(),
            size,
            Mm(MARGIN + line.indent),
            Mm(self.y),
            font,
        );
        if let Some(value) = &line.value {
            self.layer
                .use_text(value.clone(), size, Mm(VALUE_COLUMN), Mm(self.y), &self.bold);
        }
    }

    /// PDF bytes and the number of pages written
    fn finish(self) -> Result<(Vec<u8>, usize), ExportError> {
        let pages = self.pages;
        let bytes = self
            .doc
            .save_to_bytes()
            .map_err(|e| ExportError::Pdf(e.to_string()))?;
        Ok((bytes, pages))
    }
}

fn render_pages(
    analysis: &AnalysisResult,
    generated_at: DateTime<Utc>,
) -> Result<(Vec<u8>, usize), ExportError> {
    let mut writer = PageWriter::new("AI Usage Report")?;
    for line in report_lines(analysis, generated_at) {
        writer.write(&line);
    }
    writer.finish()
}

pub fn render(analysis: &AnalysisResult, generated_at: DateTime<Utc>) -> Result<Vec<u8>, ExportError> {
    render_pages(analysis, generated_at).map(|(bytes, _)| bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_analysis;
    use crate::usage::{Category, Impact, Recommendation};

    fn texts(lines: &[ReportLine]) -> Vec<String> {
        lines.iter().map(|l| l.text.clone()).collect()
    }

    #[test]
    fn test_wrap_text() {
        let wrapped = wrap_text("one two three four five", 9);
        assert_eq!(wrapped, vec!["one two", "three", "four five"]);
        assert!(wrap_text("", 10).is_empty());
        // A single long word is kept whole
        assert_eq!(wrap_text("abcdefghijkl", 5), vec!["abcdefghijkl"]);
    }

    #[test]
    fn test_report_sections() {
        let lines = report_lines(&sample_analysis(), Utc::now());
        let t = texts(&lines);
        assert_eq!(t[0], "AI Usage Report");
        assert!(t[1].starts_with("Generated: "));
        for heading in ["Executive Summary", "Models", "Recommendations"] {
            assert!(t.iter().any(|l| l == heading), "missing {}", heading);
        }
        assert!(t.contains(&"1. GPT-4: 2 requests, $20.00 (67%)".to_string()));

        let spent = lines.iter().find(|l| l.text == "Total Spent").unwrap();
        assert_eq!(spent.value.as_deref(), Some("$25.00"));
        let period = lines.iter().find(|l| l.text == "Time Period").unwrap();
        assert!(period.value.as_deref().unwrap().starts_with("3 days"));
    }

    #[test]
    fn test_recommendation_line_format() {
        let mut analysis = sample_analysis();
        analysis.recommendations = vec![Recommendation {
            title: "Cache repeated queries".into(),
            description: "word ".repeat(40),
            savings: 42,
            impact: Impact::High,
            category: Category::Caching,
            priority: 1,
        }];
        let lines = report_lines(&analysis, Utc::now());
        assert!(texts(&lines).contains(&"1. Cache repeated queries [HIGH] +$42/mo".to_string()));
        let wrapped = lines
            .iter()
            .filter(|l| l.style == LineStyle::Muted && l.indent > 0.0)
            .count();
        assert_eq!(wrapped, 3);
    }

    #[test]
    fn test_render_overflows_onto_new_pages() {
        let mut analysis = sample_analysis();
        let rec = analysis.recommendations[0].clone();
        analysis.recommendations = (0..60)
            .map(|i| Recommendation {
                priority: i + 1,
                ..rec.clone()
            })
            .collect();
        let (bytes, pages) = render_pages(&analysis, Utc::now()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(pages > 1, "expected overflow, got {} page(s)", pages);

        let (_, pages) = render_pages(&sample_analysis(), Utc::now()).unwrap();
        assert_eq!(pages, 1);
    }
}
