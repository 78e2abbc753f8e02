//! Sequential benchmark battery: every question runs through every
//! strategy, results land in the store and a JSON artifact after each
//! question so a crash loses at most the question in flight.

use crate::model::{BenchmarkRecord, StrategyKind};
use crate::storage::store::Store;
use crate::strategy::Strategy;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub struct BenchmarkHarness {
    suite: String,
    strategies: Vec<Arc<dyn Strategy>>,
    store: Store,
    artifact_dir: Option<PathBuf>,
}

/// What a finished battery leaves behind.
pub struct BatteryArtifacts {
    pub battery_id: i64,
    pub records: Vec<BenchmarkRecord>,
    pub artifact_path: Option<PathBuf>,
}

impl BenchmarkHarness {
    pub fn new(suite: impl Into<String>, strategies: Vec<Arc<dyn Strategy>>, store: Store) -> Self {
        Self {
            suite: suite.into(),
            strategies,
            store,
            artifact_dir: None,
        }
    }

    /// Also rewrite the accumulated records to a timestamped JSON file
    /// in `dir` after every question.
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }

    pub async fn run_battery(&self, questions: &[String]) -> anyhow::Result<BatteryArtifacts> {
        anyhow::ensure!(!questions.is_empty(), "battery has no questions");

        let battery_id = self.store.create_battery(&self.suite, questions.len())?;
        let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let artifact_path = self
            .artifact_dir
            .as_ref()
            .map(|dir| dir.join(format!("battery_{}.json", stamp)));

        let mut records: Vec<BenchmarkRecord> = Vec::new();
        for (idx, question) in questions.iter().enumerate() {
            info!(
                question = question.as_str(),
                position = idx + 1,
                total = questions.len(),
                "benchmarking question"
            );

            let mut outcomes = Vec::with_capacity(self.strategies.len());
            for strategy in &self.strategies {
                outcomes.push(strategy.run(question).await);
            }
            let record = BenchmarkRecord {
                question: question.clone(),
                outcomes,
            };

            self.store.insert_record(battery_id, idx, &record)?;
            records.push(record);
            if let Some(path) = &artifact_path {
                write_artifact(path, &records)?;
            }
        }

        self.store.finalize_battery(battery_id, "completed")?;
        info!(battery_id, questions = records.len(), "battery completed");

        Ok(BatteryArtifacts {
            battery_id,
            records,
            artifact_path,
        })
    }
}

fn write_artifact(path: &Path, records: &[BenchmarkRecord]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(records)?;
    std::fs::write(path, body)
        .with_context(|| format!("failed to write artifact {}", path.display()))
}

/// Aggregate figures for one strategy across a battery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyStats {
    pub strategy: StrategyKind,
    pub mean_elapsed_ms: f64,
    pub success_rate: f64,
    pub fastest_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatterySummary {
    pub question_count: usize,
    pub stats: Vec<StrategyStats>,
}

/// Per-strategy mean latency, success rate and fastest-strategy tally.
/// A question counts toward "fastest" only when one strategy is
/// strictly quicker than every other; ties count for nobody.
pub fn summarize(records: &[BenchmarkRecord]) -> BatterySummary {
    let mut kinds: Vec<StrategyKind> = Vec::new();
    for record in records {
        for outcome in &record.outcomes {
            if !kinds.contains(&outcome.strategy) {
                kinds.push(outcome.strategy);
            }
        }
    }

    let mut stats: Vec<StrategyStats> = kinds
        .iter()
        .map(|&strategy| {
            let outcomes: Vec<_> = records
                .iter()
                .flat_map(|r| r.outcomes.iter())
                .filter(|o| o.strategy == strategy)
                .collect();
            let total = outcomes.len().max(1) as f64;
            StrategyStats {
                strategy,
                mean_elapsed_ms: outcomes.iter().map(|o| o.elapsed_ms as f64).sum::<f64>() / total,
                success_rate: outcomes.iter().filter(|o| o.success).count() as f64 / total,
                fastest_count: 0,
            }
        })
        .collect();

    for record in records {
        let Some(min) = record.outcomes.iter().map(|o| o.elapsed_ms).min() else {
            continue;
        };
        let winners: Vec<_> = record
            .outcomes
            .iter()
            .filter(|o| o.elapsed_ms == min)
            .collect();
        if let [winner] = winners.as_slice() {
            if let Some(s) = stats.iter_mut().find(|s| s.strategy == winner.strategy) {
                s.fastest_count += 1;
            }
        }
    }

    BatterySummary {
        question_count: records.len(),
        stats,
    }
}
