use crate::model::{Answer, StrategyKind, StrategyOutcome};
use async_trait::async_trait;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::timeout;

pub mod agent;
pub mod direct_sql;
pub mod retrieval;

pub use agent::AgentStrategy;
pub use direct_sql::DirectSqlStrategy;
pub use retrieval::RetrievalStrategy;

/// One way of answering a question. `run` never propagates an error:
/// backing-service failures and timeouts are converted into
/// `success = false` outcomes at this boundary.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn kind(&self) -> StrategyKind;
    async fn run(&self, question: &str) -> StrategyOutcome;
}

/// Drives a strategy body under a per-call timeout, measuring elapsed
/// time from call start to completion or to the point of failure.
pub(crate) async fn execute_bounded<F>(
    kind: StrategyKind,
    question: &str,
    limit: Duration,
    body: F,
) -> StrategyOutcome
where
    F: Future<Output = anyhow::Result<(Answer, serde_json::Value)>>,
{
    let start = Instant::now();
    match timeout(limit, body).await {
        Ok(Ok((answer, details))) => {
            let mut outcome =
                StrategyOutcome::ok(question, kind, answer, start.elapsed().as_millis() as u64);
            outcome.details = details;
            outcome
        }
        Ok(Err(e)) => StrategyOutcome::failed(
            question,
            kind,
            format!("{:#}", e),
            start.elapsed().as_millis() as u64,
        ),
        Err(_) => StrategyOutcome::failed(
            question,
            kind,
            format!("timed out after {}s", limit.as_secs()),
            start.elapsed().as_millis() as u64,
        ),
    }
}
