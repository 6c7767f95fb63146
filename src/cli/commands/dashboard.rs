use colored::{ColoredString, Colorize};

use crate::usage::{AnalysisResult, Impact};

const BAR_WIDTH: usize = 30;

/// Print the full dashboard for an analysis
pub fn print(analysis: &AnalysisResult, warnings: &[String]) {
    println!("\n{}", "  AI Usage Dashboard".bold().bright_yellow());
    println!("{}", "  ─────────────────────────────".dimmed());

    if let Some(period) = &analysis.time_period {
        println!(
            "  {} {} ({} to {})",
            "Period:".bold(),
            period.label.bright_yellow(),
            period.start_date.format("%Y-%m-%d"),
            period.end_date.format("%Y-%m-%d")
        );
    }

    print_stat_cards(analysis);
    print_models(analysis);
    print_weekly(analysis);
    print_recommendations(analysis);
    print_metrics(analysis);

    if !warnings.is_empty() {
        println!("\n  {}", "Skipped Files:".bold().yellow());
        for w in warnings {
            println!("    {}", w.yellow());
        }
    }

    println!();
}

/// Whole-percent reduction that the savings represent
pub fn savings_percent(potential_savings: u64, total_spent: f64) -> u64 {
    if total_spent > 0.0 {
        (potential_savings as f64 / total_spent * 100.0).round() as u64
    } else {
        0
    }
}

fn print_stat_cards(analysis: &AnalysisResult) {
    println!(
        "\n  {:<20} {}",
        "Total Spent".bold(),
        format!("${:.2}", analysis.total_spent).bright_yellow()
    );
    println!(
        "  {:<20} {} {}",
        "Potential Savings".bold(),
        format!("${}/mo", analysis.potential_savings).green(),
        format!(
            "({}% reduction)",
            savings_percent(analysis.potential_savings, analysis.total_spent)
        )
        .dimmed()
    );
    println!(
        "  {:<20} {}",
        "Total Requests".bold(),
        analysis.total_requests.to_string().bright_yellow()
    );
    println!(
        "  {:<20} {}",
        "Files Analyzed".bold(),
        analysis.files_analyzed.to_string().bright_yellow()
    );
}

fn print_models(analysis: &AnalysisResult) {
    if analysis.models.is_empty() {
        return;
    }
    println!("\n  {}", "Model Breakdown:".bold());
    let max = analysis.models.iter().map(|m| m.requests).max().unwrap_or(1);
    for model in &analysis.models {
        let bar = "\u{2588}".repeat(bar_len(model.requests, max));
        println!(
            "    {} {} {}",
            format!("{:>18}", model.name).cyan(),
            paint(&bar, &model.color),
            format!("{} req, ${:.2} ({}%)", model.requests, model.cost, model.usage).dimmed()
        );
    }
}

fn print_weekly(analysis: &AnalysisResult) {
    println!("\n  {}", "Weekly Usage:".bold());
    let max = analysis
        .weekly_usage
        .iter()
        .map(|d| d.requests)
        .max()
        .unwrap_or(0);
    for day in &analysis.weekly_usage {
        let bar = "\u{2588}".repeat(bar_len(day.requests, max));
        println!(
            "    {} {} {}",
            day.day.dimmed(),
            bar.bright_yellow(),
            format!("{} req, ${:.2}", day.requests, day.cost).dimmed()
        );
    }
}

fn print_recommendations(analysis: &AnalysisResult) {
    println!("\n  {}", "Recommendations:".bold());
    if analysis.recommendations.is_empty() {
        println!("    {}", "Nothing to suggest for this dataset".dimmed());
        return;
    }
    for rec in &analysis.recommendations {
        println!(
            "    {} {} {} {}",
            format!("#{}", rec.priority).dimmed(),
            rec.title.bold(),
            impact_label(rec.impact),
            format!("+${}/mo", rec.savings).green()
        );
        println!("       {}", rec.description.dimmed());
    }
}

fn print_metrics(analysis: &AnalysisResult) {
    let m = &analysis.metrics;
    println!("\n  {}", "Metrics:".bold());
    println!("    {:<24} ${:.4}", "Avg cost / request", m.avg_cost_per_request);
    println!("    {:<24} {:.0}", "Avg tokens / request", m.avg_tokens_per_request);
    if m.avg_duration > 0.0 {
        println!("    {:<24} {:.0} ms", "Avg duration", m.avg_duration);
    }
    println!(
        "    {:<24} {} ({}%, ${:.2})",
        "Likely duplicates", m.duplicate_count, m.duplicate_percentage, m.duplicate_cost
    );
    if m.input_output_ratio > 0.0 {
        println!("    {:<24} {:.2}:1", "Input:output tokens", m.input_output_ratio);
    }

    let thinking = &analysis.extended_thinking;
    if thinking.count > 0 {
        println!(
            "    {:<24} {} requests, ${:.2} ({}%)",
            "Extended thinking", thinking.count, thinking.cost, thinking.percentage
        );
    }
}

fn bar_len(value: u64, max: u64) -> usize {
    if max == 0 {
        0
    } else {
        (value as usize * BAR_WIDTH) / max as usize
    }
}

fn impact_label(impact: Impact) -> ColoredString {
    let label = format!("[{}]", impact.as_str().to_uppercase());
    match impact {
        Impact::High => label.red().bold(),
        Impact::Medium => label.yellow(),
        Impact::Low => label.blue(),
    }
}

/// Color text with a `#RRGGBB` palette entry, plain when it does not parse
fn paint(text: &str, hex: &str) -> ColoredString {
    match parse_hex(hex) {
        Some((r, g, b)) => text.truecolor(r, g, b),
        None => text.normal(),
    }
}

fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}
