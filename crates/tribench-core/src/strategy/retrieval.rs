use super::{execute_bounded, Strategy};
use crate::model::{Answer, StrategyKind, StrategyOutcome};
use crate::providers::llm::CompletionClient;
use crate::providers::retriever::Retriever;
use crate::schema::SchemaCache;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_PASSAGES: usize = 5;

/// Retrieves the most similar indexed passages and asks the completion
/// service to answer from them plus the schema text. Produces and
/// executes no SQL.
pub struct RetrievalStrategy {
    client: Arc<dyn CompletionClient>,
    retriever: Arc<dyn Retriever>,
    schema: Arc<SchemaCache>,
    passages: usize,
    timeout: Duration,
}

impl RetrievalStrategy {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        retriever: Arc<dyn Retriever>,
        schema: Arc<SchemaCache>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            retriever,
            schema,
            passages: DEFAULT_PASSAGES,
            timeout,
        }
    }

    pub fn with_passages(mut self, passages: usize) -> Self {
        self.passages = passages;
        self
    }
}

#[async_trait]
impl Strategy for RetrievalStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Retrieval
    }

    async fn run(&self, question: &str) -> StrategyOutcome {
        execute_bounded(StrategyKind::Retrieval, question, self.timeout, async {
            let hits = self.retriever.search(question, self.passages).await?;
            let context: Vec<String> = hits.iter().map(|(doc, _)| doc.content.clone()).collect();
            let schema = self.schema.full_schema()?;
            let prompt = build_rag_prompt(&schema, &context, question);
            let text = self.client.complete(&prompt).await?;
            Ok((
                Answer::Text { text },
                serde_json::json!({ "passages": hits.len() }),
            ))
        })
        .await
    }
}

fn build_rag_prompt(schema: &str, context: &[String], question: &str) -> String {
    format!(
        "You are a helpful assistant answering questions over a relational dataset.\n\
         Use the following database schema information and retrieved context to answer the question.\n\n\
         Database Schema:\n{}\n\n\
         Retrieved context:\n{}\n\n\
         Question: {}\n\n\
         Answer:",
        schema,
        context.join("\n\n"),
        question
    )
}
