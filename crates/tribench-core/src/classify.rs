use crate::model::Classification;
use crate::providers::llm::CompletionClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Fixed few-shot instruction. The service must answer with the
/// literal token `sql` or `rag`.
const CLASSIFIER_PROMPT: &str = "\
You are a query classifier that determines whether a natural language query is better suited for:

1. SQL: queries requiring precise calculations, aggregations, exact counts, or structured data operations
2. RAG (Retrieval Augmented Generation): queries requiring context understanding, narrative responses, or inference from text

Examples of SQL queries:
- \"How many orders does customer John Doe have?\"
- \"What is the average rating of products in Electronics category?\"
- \"List all customers with open support tickets\"

Examples of RAG queries:
- \"Why did customer Jane Smith contact support recently?\"
- \"What kinds of issues are customers having with headphones?\"
- \"Summarize John's purchase history and preferences\"

For the following query, respond with ONLY \"sql\" or \"rag\" (lowercase):";

/// Single-shot, stateless classifier. Anything other than the two
/// literal tokens — including a failed or timed-out call — defaults to
/// `Structured`: the SQL path fails loudly, while the contextual path
/// can silently answer wrong.
pub struct QueryClassifier {
    client: Arc<dyn CompletionClient>,
    timeout: Duration,
}

impl QueryClassifier {
    pub fn new(client: Arc<dyn CompletionClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub async fn classify(&self, question: &str) -> Classification {
        let prompt = format!("{}\n\nQuery: {}\n\nClassification:", CLASSIFIER_PROMPT, question);

        match timeout(self.timeout, self.client.complete(&prompt)).await {
            Ok(Ok(response)) => parse_label(&response),
            Ok(Err(e)) => {
                debug!(error = %e, "classifier call failed, defaulting to structured");
                Classification::Structured
            }
            Err(_) => {
                debug!("classifier call timed out, defaulting to structured");
                Classification::Structured
            }
        }
    }
}

pub fn parse_label(response: &str) -> Classification {
    match response.trim().to_lowercase().as_str() {
        "sql" => Classification::Structured,
        "rag" => Classification::Contextual,
        _ => Classification::Structured,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::llm::fake::{FailingCompletion, ScriptedCompletion};

    #[test]
    fn label_normalization() {
        assert_eq!(parse_label("SQL"), Classification::Structured);
        assert_eq!(parse_label(" Sql \n"), Classification::Structured);
        assert_eq!(parse_label("RAG"), Classification::Contextual);
        assert_eq!(parse_label("maybe"), Classification::Structured);
        assert_eq!(parse_label(""), Classification::Structured);
    }

    #[tokio::test]
    async fn contextual_answer_routes_to_retrieval_label() {
        let client = Arc::new(ScriptedCompletion::new("rag"));
        let classifier = QueryClassifier::new(client, Duration::from_secs(5));
        let label = classifier.classify("why did the customer complain?").await;
        assert_eq!(label, Classification::Contextual);
    }

    #[tokio::test]
    async fn service_failure_defaults_to_structured() {
        let client = Arc::new(FailingCompletion::new("service down"));
        let classifier = QueryClassifier::new(client, Duration::from_secs(5));
        let label = classifier.classify("anything").await;
        assert_eq!(label, Classification::Structured);
    }
}
