use async_trait::async_trait;
use std::sync::Arc;

use tribench_core::harness::{summarize, BenchmarkHarness};
use tribench_core::model::{Answer, StrategyKind, StrategyOutcome};
use tribench_core::storage::store::Store;
use tribench_core::strategy::Strategy;

/// Answers instantly with a fixed result and a fixed reported latency.
struct StaticStrategy {
    kind: StrategyKind,
    elapsed_ms: u64,
    success: bool,
}

#[async_trait]
impl Strategy for StaticStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    async fn run(&self, question: &str) -> StrategyOutcome {
        if self.success {
            StrategyOutcome::ok(
                question,
                self.kind,
                Answer::Text {
                    text: format!("{} says ok", self.kind),
                },
                self.elapsed_ms,
            )
        } else {
            StrategyOutcome::failed(question, self.kind, "scripted failure".into(), self.elapsed_ms)
        }
    }
}

fn strategies() -> Vec<Arc<dyn Strategy>> {
    vec![
        Arc::new(StaticStrategy {
            kind: StrategyKind::Agent,
            elapsed_ms: 300,
            success: false,
        }),
        Arc::new(StaticStrategy {
            kind: StrategyKind::DirectSql,
            elapsed_ms: 50,
            success: true,
        }),
        Arc::new(StaticStrategy {
            kind: StrategyKind::Retrieval,
            elapsed_ms: 120,
            success: true,
        }),
    ]
}

#[tokio::test]
async fn battery_runs_every_strategy_per_question_in_order() -> anyhow::Result<()> {
    let store = Store::memory()?;
    store.init_schema()?;
    let harness = BenchmarkHarness::new("suite", strategies(), store.clone());

    let questions: Vec<String> = ["q one", "q two", "q three"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let artifacts = harness.run_battery(&questions).await?;

    assert_eq!(artifacts.records.len(), 3);
    for (record, question) in artifacts.records.iter().zip(&questions) {
        assert_eq!(&record.question, question);
        let kinds: Vec<StrategyKind> = record.outcomes.iter().map(|o| o.strategy).collect();
        assert_eq!(
            kinds,
            vec![
                StrategyKind::Agent,
                StrategyKind::DirectSql,
                StrategyKind::Retrieval
            ]
        );
    }

    // everything the harness returned is also in the store
    let stored = store.fetch_battery(artifacts.battery_id)?;
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[0].question, "q one");
    assert_eq!(stored[2].outcomes.len(), 3);

    let summary = summarize(&artifacts.records);
    let direct = summary
        .stats
        .iter()
        .find(|s| s.strategy == StrategyKind::DirectSql)
        .unwrap();
    assert_eq!(direct.fastest_count, 3);
    assert!((direct.success_rate - 1.0).abs() < f64::EPSILON);

    let agent = summary
        .stats
        .iter()
        .find(|s| s.strategy == StrategyKind::Agent)
        .unwrap();
    assert!((agent.success_rate - 0.0).abs() < f64::EPSILON);
    assert!((agent.mean_elapsed_ms - 300.0).abs() < f64::EPSILON);
    Ok(())
}

#[tokio::test]
async fn artifact_json_is_rewritten_after_each_question() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = Store::memory()?;
    store.init_schema()?;
    let harness =
        BenchmarkHarness::new("suite", strategies(), store).with_artifact_dir(dir.path());

    let questions = vec!["only question".to_string()];
    let artifacts = harness.run_battery(&questions).await?;

    let path = artifacts.artifact_path.expect("artifact path set");
    let body = std::fs::read_to_string(&path)?;
    let parsed: Vec<tribench_core::model::BenchmarkRecord> = serde_json::from_str(&body)?;
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].question, "only question");
    assert_eq!(parsed[0].outcomes.len(), 3);
    Ok(())
}

#[tokio::test]
async fn empty_battery_is_rejected() -> anyhow::Result<()> {
    let store = Store::memory()?;
    store.init_schema()?;
    let harness = BenchmarkHarness::new("suite", strategies(), store);

    assert!(harness.run_battery(&[]).await.is_err());
    Ok(())
}
