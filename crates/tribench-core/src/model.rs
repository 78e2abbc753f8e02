use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single result row: ordered column name -> scalar value.
pub type Row = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Agent,
    DirectSql,
    Retrieval,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Agent => "agent",
            StrategyKind::DirectSql => "direct_sql",
            StrategyKind::Retrieval => "retrieval",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "agent" => Some(StrategyKind::Agent),
            "direct_sql" => Some(StrategyKind::DirectSql),
            "retrieval" => Some(StrategyKind::Retrieval),
            _ => None,
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label produced by the classifier for an incoming question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Deterministic aggregation/filtering over tabular data; favor SQL.
    Structured,
    /// Narrative synthesis from unstructured context; favor retrieval.
    Contextual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Answer {
    Text { text: String },
    Rows { rows: Vec<Row> },
}

/// Normalized result of one strategy run. If `success` is false the
/// outcome carries a readable error and no partial data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyOutcome {
    pub question: String,
    pub strategy: StrategyKind,
    pub success: bool,
    pub answer: Option<Answer>,
    pub error: Option<String>,
    pub elapsed_ms: u64,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl StrategyOutcome {
    pub fn ok(question: &str, strategy: StrategyKind, answer: Answer, elapsed_ms: u64) -> Self {
        Self {
            question: question.to_string(),
            strategy,
            success: true,
            answer: Some(answer),
            error: None,
            elapsed_ms,
            details: serde_json::json!({}),
        }
    }

    pub fn failed(question: &str, strategy: StrategyKind, error: String, elapsed_ms: u64) -> Self {
        Self {
            question: question.to_string(),
            strategy,
            success: false,
            answer: None,
            error: Some(error),
            elapsed_ms,
            details: serde_json::json!({}),
        }
    }
}

/// One benchmarked question with the outcome of every strategy,
/// in the order the strategies ran. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub question: String,
    pub outcomes: Vec<StrategyOutcome>,
}

/// Outcome of a routed question, tagged with how it was routed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutedAnswer {
    pub outcome: StrategyOutcome,
    pub classification: Option<Classification>,
    pub fallback: bool,
    pub narrative: Option<String>,
}

/// Router response. Rate-limit denial is a defined outcome with a
/// retry-after hint, not an error.
#[derive(Debug, Clone)]
pub enum RouteResponse {
    Answered(Box<RoutedAnswer>),
    RateLimited { retry_after: std::time::Duration },
}
