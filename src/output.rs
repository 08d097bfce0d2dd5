use crate::models::{EvaluationResult, Statistics};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    Plain,
    Json,
}

/// Print the evaluation result in the specified format
pub fn print_result(result: &EvaluationResult, format: OutputFormat) {
    match format {
        OutputFormat::Plain => print!("{}", render_plain(result)),
        OutputFormat::Json => match render_json(result) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing result to JSON: {}", e),
        },
    }
}

pub fn render_json(result: &EvaluationResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(result)
}

/// Render the statistics table followed by every sample's scores
pub fn render_plain(result: &EvaluationResult) -> String {
    let mut out = String::new();

    out.push_str("📊 STATISTICS\n");
    out.push_str("-------------\n");
    render_statistics(&mut out, &result.summary, &result.metric_names());
    out.push('\n');

    out.push_str("📝 DETAILED RESULTS\n");
    out.push_str("-------------------\n");
    for (i, sample) in result.samples.iter().enumerate() {
        out.push_str(&format!("Sample #{}\n", i + 1));
        out.push_str(&format!("Question: {}\n", sample.user_input));
        out.push_str(&format!("Response: {}\n", sample.response));
        out.push_str(&format!("Reference: {}\n", sample.reference));
        out.push_str("Scores:\n");

        let mut scores: Vec<_> = sample.scores.iter().collect();
        scores.sort_by(|a, b| a.0.cmp(b.0));
        for (metric, score) in scores {
            out.push_str(&format!("  • {}: {:.3}\n", metric, score));
        }
        out.push('\n');
    }

    out
}

fn render_statistics(out: &mut String, stats: &Statistics, metrics: &[String]) {
    if metrics.is_empty() {
        out.push_str("No statistics available.\n");
        return;
    }

    let width = metrics.iter().map(|m| m.len()).max().unwrap_or(0).max(15);
    out.push_str(&format!(
        "{:<width$} {:<8} {:<8} {:<8}\n",
        "Metric", "Mean", "Median", "Mode"
    ));
    out.push_str(&format!("{}\n", "-".repeat(width + 27)));

    for metric in metrics {
        let mean = stats.mean.get(metric).unwrap_or(&0.0);
        let median = stats.median.get(metric).unwrap_or(&0.0);
        let mode = stats.mode.get(metric).unwrap_or(&0.0);

        out.push_str(&format!(
            "{:<width$} {:<8.3} {:<8.3} {:<8.3}\n",
            metric, mean, median, mode
        ));
    }
}
