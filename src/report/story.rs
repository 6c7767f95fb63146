//! Narrative walk-through of an analysis, one slide per highlight.

use crate::usage::AnalysisResult;

/// Recommendations shown as their own slides
const MAX_RECOMMENDATION_SLIDES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideKind {
    Intro,
    Spend,
    Requests,
    Models,
    Patterns,
    Thinking,
    Recommendation,
    Summary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    pub kind: SlideKind,
    pub title: String,
    pub lines: Vec<String>,
}

impl Slide {
    fn new(kind: SlideKind, title: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            lines,
        }
    }
}

pub fn build_slides(analysis: &AnalysisResult) -> Vec<Slide> {
    let days = analysis.days_in_period() as f64;
    let avg_per_day = (analysis.total_spent / days).round();
    let requests_per_day = (analysis.total_requests as f64 / days).round();

    let mut spend = Vec::new();
    match &analysis.time_period {
        Some(p) => {
            spend.push(format!("Over **{}** you invested **${:.2}**", p.label, analysis.total_spent));
            spend.push(format!(
                "{} - {}",
                p.start_date.format("%b %-d"),
                p.end_date.format("%b %-d")
            ));
        }
        None => spend.push(format!("You invested **${:.2}**", analysis.total_spent)),
    }
    spend.push(format!("That's about **${}/day** on AI", avg_per_day));

    let mut slides = vec![
        Slide::new(
            SlideKind::Intro,
            "Your AI Usage Story",
            vec![format!(
                "A look back at {} file(s) of usage data",
                analysis.files_analyzed
            )],
        ),
        Slide::new(SlideKind::Spend, "Spend", spend),
        Slide::new(
            SlideKind::Requests,
            "Requests",
            vec![
                format!("You made **{}** API calls", analysis.total_requests),
                format!(
                    "That's roughly **{}** every single day",
                    plural(requests_per_day as u64, "request")
                ),
            ],
        ),
        Slide::new(
            SlideKind::Models,
            "Your go-to model",
            match analysis.models.first() {
                Some(top) => vec![
                    format!("**{}**", top.full_name),
                    format!("Used for **{}%** of your requests", top.usage),
                ],
                None => vec!["No model data in this dataset".to_string()],
            },
        ),
        Slide::new(
            SlideKind::Patterns,
            "Patterns",
            match analysis.busiest_day() {
                Some(day) => vec![
                    format!("**{}** was your power day", day.day),
                    format!("{} requests, ${:.2} spent", day.requests, day.cost),
                ],
                None => vec!["No weekly pattern available".to_string()],
            },
        ),
    ];

    let thinking = &analysis.extended_thinking;
    if thinking.count > 0 {
        slides.push(Slide::new(
            SlideKind::Thinking,
            "Deep thinking mode",
            vec![
                format!("Used **{}** times", thinking.count),
                format!(
                    "Costing **${:.2}** ({}% of requests)",
                    thinking.cost, thinking.percentage
                ),
            ],
        ));
    }

    for (i, rec) in analysis
        .recommendations
        .iter()
        .take(MAX_RECOMMENDATION_SLIDES)
        .enumerate()
    {
        slides.push(Slide::new(
            SlideKind::Recommendation,
            format!("Optimization #{}: {}", i + 1, rec.title),
            vec![
                rec.description.clone(),
                format!("**+${}/mo** ({} impact)", rec.savings, rec.impact.as_str()),
            ],
        ));
    }

    slides.push(Slide::new(
        SlideKind::Summary,
        "Your potential savings",
        vec![format!("**${}** per month", analysis.potential_savings)],
    ));

    slides
}

fn plural(count: u64, noun: &str) -> String {
    if count == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

/// Markdown for the whole deck, slides separated by rules
pub fn render_markdown(slides: &[Slide]) -> String {
    let mut out = String::new();
    for (i, slide) in slides.iter().enumerate() {
        if i > 0 {
            out.push_str("\n---\n\n");
        }
        out.push_str(&format!("## {}\n\n", slide.title));
        for line in &slide.lines {
            out.push_str(line);
            out.push_str("\n\n");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_analysis;

    fn kinds(slides: &[Slide]) -> Vec<SlideKind> {
        slides.iter().map(|s| s.kind).collect()
    }

    #[test]
    fn test_slide_order_without_thinking() {
        let analysis = sample_analysis();
        let slides = build_slides(&analysis);
        let k = kinds(&slides);
        assert_eq!(
            &k[..5],
            &[
                SlideKind::Intro,
                SlideKind::Spend,
                SlideKind::Requests,
                SlideKind::Models,
                SlideKind::Patterns
            ]
        );
        assert!(!k.contains(&SlideKind::Thinking));
        assert_eq!(k.last(), Some(&SlideKind::Summary));
        let recs = k.iter().filter(|k| **k == SlideKind::Recommendation).count();
        assert_eq!(recs, analysis.recommendations.len().min(3));
    }

    #[test]
    fn test_thinking_slide_when_used() {
        let mut analysis = sample_analysis();
        analysis.extended_thinking.count = 2;
        analysis.extended_thinking.cost = 4.0;
        let slides = build_slides(&analysis);
        assert_eq!(slides[5].kind, SlideKind::Thinking);
    }

    #[test]
    fn test_per_day_figures_use_period_length() {
        let analysis = sample_analysis();
        // 3 day period, $25 total
        let slides = build_slides(&analysis);
        let spend = &slides[1];
        assert!(spend.lines[0].contains("3 days"));
        assert!(spend.lines[1].starts_with("Jan 5"));
        assert!(spend.lines.last().unwrap().contains("$8/day"));
        assert!(slides[2].lines[1].contains("**1 request** every"));
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "request"), "1 request");
        assert_eq!(plural(0, "request"), "0 requests");
        assert_eq!(plural(12, "request"), "12 requests");
    }

    #[test]
    fn test_markdown_rendering() {
        let slides = build_slides(&sample_analysis());
        let md = render_markdown(&slides);
        assert!(md.starts_with("## Your AI Usage Story"));
        assert!(md.contains("## Your go-to model"));
        assert!(md.contains("**GPT-4**"));
        assert_eq!(md.matches("\n---\n").count(), slides.len() - 1);
    }
}
