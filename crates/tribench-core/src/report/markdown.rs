use crate::harness::BatterySummary;
use crate::model::{Answer, BenchmarkRecord};
use std::fmt::Write;

/// Renders the battery as a markdown report: a metric table comparing
/// strategies, then a per-question breakdown.
pub fn render(summary: &BatterySummary, records: &[BenchmarkRecord]) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Performance Benchmark Report");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Generated: {}",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Questions benchmarked: {}", summary.question_count);
    let _ = writeln!(out);

    let _ = writeln!(out, "## Summary");
    let _ = writeln!(out);
    let mut header = String::from("| Metric |");
    let mut divider = String::from("|---|");
    for stat in &summary.stats {
        let _ = write!(header, " {} |", stat.strategy);
        divider.push_str("---|");
    }
    let _ = writeln!(out, "{}", header);
    let _ = writeln!(out, "{}", divider);

    let mut row = String::from("| Average Response Time (s) |");
    for stat in &summary.stats {
        let _ = write!(row, " {:.2} |", stat.mean_elapsed_ms / 1000.0);
    }
    let _ = writeln!(out, "{}", row);

    let mut row = String::from("| Success Rate (%) |");
    for stat in &summary.stats {
        let _ = write!(row, " {:.1} |", stat.success_rate * 100.0);
    }
    let _ = writeln!(out, "{}", row);

    let mut row = String::from("| Fastest Strategy Count |");
    for stat in &summary.stats {
        let _ = write!(row, " {} |", stat.fastest_count);
    }
    let _ = writeln!(out, "{}", row);
    let _ = writeln!(out);

    let _ = writeln!(out, "## Questions");
    for (i, record) in records.iter().enumerate() {
        let _ = writeln!(out);
        let _ = writeln!(out, "### {}. {}", i + 1, record.question);
        let _ = writeln!(out);
        let complexity = crate::complexity::analyze(&record.question);
        let _ = writeln!(
            out,
            "Estimated complexity: score {}, ~{} table(s)",
            complexity.score, complexity.estimated_tables
        );
        let _ = writeln!(out);
        for outcome in &record.outcomes {
            let status = if outcome.success { "ok" } else { "failed" };
            let _ = writeln!(
                out,
                "- **{}** — {} in {:.2}s",
                outcome.strategy,
                status,
                outcome.elapsed_ms as f64 / 1000.0
            );
            match (&outcome.answer, &outcome.error) {
                (Some(answer), _) => {
                    let _ = writeln!(out, "  - {}", preview(answer));
                }
                (None, Some(error)) => {
                    let _ = writeln!(out, "  - error: {}", error);
                }
                (None, None) => {}
            }
        }
    }

    out
}

const PREVIEW_LEN: usize = 200;

fn preview(answer: &Answer) -> String {
    let text = match answer {
        Answer::Text { text } => text.clone(),
        Answer::Rows { rows } => format!(
            "{} row(s): {}",
            rows.len(),
            serde_json::to_string(rows).unwrap_or_default()
        ),
    };
    let flat = text.replace('\n', " ");
    if flat.chars().count() > PREVIEW_LEN {
        let clipped: String = flat.chars().take(PREVIEW_LEN).collect();
        format!("{}…", clipped)
    } else {
        flat
    }
}
