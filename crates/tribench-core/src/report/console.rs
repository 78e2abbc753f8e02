use crate::harness::BatterySummary;
use crate::model::BenchmarkRecord;

/// Human-readable battery summary on stderr.
pub fn print_summary(summary: &BatterySummary, records: &[BenchmarkRecord]) {
    eprintln!();
    eprintln!("Benchmark: {} questions", summary.question_count);
    eprintln!("{}", "-".repeat(60));

    for record in records {
        eprintln!("{}", record.question);
        for outcome in &record.outcomes {
            let mark = if outcome.success { "✅" } else { "❌" };
            match &outcome.error {
                Some(error) => eprintln!(
                    "  {} {:<11} {:>6}ms  {}",
                    mark,
                    outcome.strategy.as_str(),
                    outcome.elapsed_ms,
                    error
                ),
                None => eprintln!(
                    "  {} {:<11} {:>6}ms",
                    mark,
                    outcome.strategy.as_str(),
                    outcome.elapsed_ms
                ),
            }
        }
    }

    eprintln!("{}", "-".repeat(60));
    for stat in &summary.stats {
        eprintln!(
            "{:<11}  avg {:>8.1}ms  success {:>5.1}%  fastest {}x",
            stat.strategy.as_str(),
            stat.mean_elapsed_ms,
            stat.success_rate * 100.0,
            stat.fastest_count
        );
    }
    eprintln!();
}
