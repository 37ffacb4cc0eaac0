// Colored terminal output for summaries, score totals and bias reports.
//
// All user-facing formatting lives here; main.rs only decides what to show.

use colored::{ColoredString, Colorize};

use crate::corpus::ResultCollection;
use crate::pipeline::filter::FilterReport;
use crate::scoring::bias::BiasReport;
use crate::scoring::cheetah::{CheetahScorer, ScoreStats};

use super::artifact::ScoreArtifact;
use super::truncate_chars;

/// Green for positive, red for negative, dimmed for zero.
fn colorize_score(score: f64) -> ColoredString {
    let text = format!("{score:>10.3}");
    if score > 0.0 {
        text.green()
    } else if score < 0.0 {
        text.red()
    } else {
        text.dimmed()
    }
}

/// Per-collection, per-topic headline counts and date span.
pub fn display_collection_summary(collections: &[ResultCollection]) {
    if collections.is_empty() {
        println!("No collections loaded.");
        return;
    }

    for collection in collections {
        println!(
            "\n{}",
            format!("=== {} ({} headlines) ===", collection.name, collection.headline_count()).bold()
        );
        match collection.min_max_dt() {
            Some((lo, hi)) => println!("  Span: {} .. {}", lo.date(), hi.date()),
            None => println!("  {}", "Span: (empty)".dimmed()),
        }
        for result in collection.results() {
            println!(
                "  {:>7}  {}",
                result.headlines.len(),
                truncate_chars(&result.topics().join(", "), 60).cyan()
            );
        }
    }
    println!();
}

pub fn display_filter_report(report: &FilterReport) {
    println!("\n{}", "=== Filter Pipeline ===".bold());
    println!("  Input:              {:>7}", report.input);
    println!("  After date filter:  {:>7}", report.after_date);
    println!("  After dedup:        {:>7}", report.after_dedup);
    println!("  After cross filter: {:>7}", report.after_cross_filter);

    for (from, to) in &report.condensed {
        println!("  {} '{}' -> '{}'", "Condensed".dimmed(), from, to);
    }
    for (a, b) in &report.overlapping_topics {
        println!(
            "  {} {:?} and {:?} share terms",
            "Warning:".yellow().bold(),
            a,
            b
        );
    }
    println!();
}

pub fn display_score_stats(scorer: &CheetahScorer, stats: &ScoreStats) {
    let coverage = scorer.coverage();
    let (pos_used, neg_used) = scorer.terms_used();
    println!(
        "  Lexicon: {} positive ({:.0}% in model), {} negative ({:.0}% in model)",
        pos_used,
        coverage.positive.hit_rate() * 100.0,
        neg_used,
        coverage.negative.hit_rate() * 100.0,
    );
    let line = format!(
        "  Scored {} headlines, {} with no in-vocabulary tokens",
        stats.scored, stats.no_signal
    );
    if stats.no_signal > 0 {
        println!("{}", line.yellow());
    } else {
        println!("{line}");
    }
}

/// Gross per-topic totals for one source.
pub fn display_gross_scores(source: &str, artifact: &ScoreArtifact) {
    println!(
        "\n{}",
        format!("=== {} ({} bins) ===", source, artifact.bin_keys.len()).bold()
    );
    for (topic, total) in artifact.gross_totals() {
        println!("  {:<24} {}", topic, colorize_score(total));
    }
    println!();
}

pub fn display_bias_reports(reports: &[BiasReport]) {
    println!("\n{}", "=== Model Bias ===".bold());
    println!(
        "  {:<32} {:>10} {:>10} {:>10}  {}",
        "Topics".dimmed(),
        "Positive".dimmed(),
        "Negative".dimmed(),
        "Net".dimmed(),
        "Misses".dimmed(),
    );
    println!("  {}", "-".repeat(76).dimmed());

    for report in reports {
        println!(
            "  {:<32} {:>10.3} {:>10.3} {}  {}/{}",
            truncate_chars(&report.topics.join(", "), 29),
            report.positive,
            report.negative,
            colorize_score(report.net()),
            report.topic_misses,
            report.topic_hits + report.topic_misses,
        );
    }
    println!();
}
