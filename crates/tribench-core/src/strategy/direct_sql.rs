use super::{execute_bounded, Strategy};
use crate::cache::ResultCache;
use crate::model::{Answer, StrategyKind, StrategyOutcome};
use crate::providers::llm::CompletionClient;
use crate::schema::SchemaCache;
use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;

/// One completion call turns question + full schema into a single SQL
/// string, executed once through the result cache. No self-correction:
/// a malformed query surfaces as a failure outcome.
pub struct DirectSqlStrategy {
    client: Arc<dyn CompletionClient>,
    schema: Arc<SchemaCache>,
    cache: Arc<ResultCache>,
    timeout: Duration,
}

impl DirectSqlStrategy {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        schema: Arc<SchemaCache>,
        cache: Arc<ResultCache>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            schema,
            cache,
            timeout,
        }
    }
}

#[async_trait]
impl Strategy for DirectSqlStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DirectSql
    }

    async fn run(&self, question: &str) -> StrategyOutcome {
        execute_bounded(StrategyKind::DirectSql, question, self.timeout, async {
            let schema = self.schema.full_schema()?;
            let prompt = build_sql_prompt(&schema, question);
            let response = self.client.complete(&prompt).await?;
            let sql = extract_sql(&response)?;
            let rows = self.cache.execute(&sql)?;
            Ok((Answer::Rows { rows }, serde_json::json!({ "sql": sql })))
        })
        .await
    }
}

fn build_sql_prompt(schema: &str, question: &str) -> String {
    format!(
        "You are an expert SQL query generator.\n\
         Given the following database schema and a question, generate a SQL query that answers the question.\n\
         Return ONLY the SQL query, nothing else.\n\n\
         Database Schema:\n{}\n\n\
         Question: {}\n\n\
         SQL Query:",
        schema, question
    )
}

/// Pulls the executable statement out of a completion response. The
/// contract expects bare SQL, but models routinely wrap it in a fenced
/// code block; the fenced content wins when present.
pub fn extract_sql(response: &str) -> anyhow::Result<String> {
    let fenced = Regex::new(r"(?s)```(?:sql)?\s*(.*?)```")
        .ok()
        .and_then(|re| {
            re.captures(response)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        });

    let sql = fenced.unwrap_or_else(|| response.to_string());
    let sql = sql.trim();
    if sql.is_empty() {
        anyhow::bail!("completion response contained no SQL statement");
    }
    Ok(sql.to_string())
}
