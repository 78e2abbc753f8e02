use super::{execute_bounded, Strategy};
use crate::model::{Answer, StrategyKind, StrategyOutcome};
use crate::providers::agent::AgentClient;
use crate::providers::retriever::Retriever;
use crate::schema::SchemaCache;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Delegates planning and execution to an autonomous agent service,
/// passing schema text as context. With a table retriever attached,
/// the schema context narrows to the tables most relevant to the
/// question; otherwise the full schema is sent.
pub struct AgentStrategy {
    agent: Arc<dyn AgentClient>,
    schema: Arc<SchemaCache>,
    table_retriever: Option<(Arc<dyn Retriever>, usize)>,
    timeout: Duration,
}

impl AgentStrategy {
    pub fn new(agent: Arc<dyn AgentClient>, schema: Arc<SchemaCache>, timeout: Duration) -> Self {
        Self {
            agent,
            schema,
            table_retriever: None,
            timeout,
        }
    }

    pub fn with_table_narrowing(mut self, retriever: Arc<dyn Retriever>, k: usize) -> Self {
        self.table_retriever = Some((retriever, k));
        self
    }

    async fn schema_context(&self, question: &str) -> anyhow::Result<String> {
        let Some((retriever, k)) = &self.table_retriever else {
            return self.schema.full_schema();
        };

        let tables = self
            .schema
            .relevant_tables(retriever.as_ref(), question, *k)
            .await?;
        let defs = self.schema.table_definitions()?;
        let context: Vec<String> = tables.iter().filter_map(|t| defs.get(t).cloned()).collect();
        Ok(context.join("\n\n"))
    }
}

#[async_trait]
impl Strategy for AgentStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Agent
    }

    async fn run(&self, question: &str) -> StrategyOutcome {
        execute_bounded(StrategyKind::Agent, question, self.timeout, async {
            let schema = self.schema_context(question).await?;
            let text = self.agent.solve(question, &schema).await?;
            Ok((
                Answer::Text { text },
                serde_json::json!({ "provider": self.agent.provider_name() }),
            ))
        })
        .await
    }
}
