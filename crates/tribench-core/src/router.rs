use crate::classify::QueryClassifier;
use crate::model::{
    Answer, Classification, RouteResponse, RoutedAnswer, StrategyOutcome,
};
use crate::providers::llm::CompletionClient;
use crate::ratelimit::RateLimiter;
use crate::strategy::Strategy;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Which runner handles questions classified as structured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuredRoute {
    DirectSql,
    Agent,
}

/// Composes classifier, strategy runners and rate limiter. Owns all
/// its state explicitly; nothing here is ambient or global.
pub struct HybridRouter {
    classifier: QueryClassifier,
    agent: Arc<dyn Strategy>,
    direct_sql: Arc<dyn Strategy>,
    retrieval: Arc<dyn Strategy>,
    limiter: Arc<RateLimiter>,
    structured_route: StructuredRoute,
    enrichment: Option<Arc<dyn CompletionClient>>,
    enrichment_timeout: Duration,
}

impl HybridRouter {
    pub fn new(
        classifier: QueryClassifier,
        agent: Arc<dyn Strategy>,
        direct_sql: Arc<dyn Strategy>,
        retrieval: Arc<dyn Strategy>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            classifier,
            agent,
            direct_sql,
            retrieval,
            limiter,
            structured_route: StructuredRoute::DirectSql,
            enrichment: None,
            enrichment_timeout: Duration::from_secs(30),
        }
    }

    pub fn route_structured_to(mut self, route: StructuredRoute) -> Self {
        self.structured_route = route;
        self
    }

    /// Post-process successful SQL rows into a narrative answer with
    /// one extra completion call.
    pub fn with_enrichment(mut self, client: Arc<dyn CompletionClient>, timeout: Duration) -> Self {
        self.enrichment = Some(client);
        self.enrichment_timeout = timeout;
        self
    }

    /// Classification routing: classify, then invoke exactly one
    /// runner. The outcome is tagged with the classification used.
    pub async fn route(&self, caller: &str, question: &str) -> RouteResponse {
        let admission = self.limiter.admit(caller);
        if !admission.allowed {
            return RouteResponse::RateLimited {
                retry_after: admission.retry_after,
            };
        }

        let label = self.classifier.classify(question).await;
        let strategy = match (label, self.structured_route) {
            (Classification::Structured, StructuredRoute::DirectSql) => &self.direct_sql,
            (Classification::Structured, StructuredRoute::Agent) => &self.agent,
            (Classification::Contextual, _) => &self.retrieval,
        };
        info!(
            classification = label_str(label),
            strategy = %strategy.kind(),
            "routing by classification"
        );

        let outcome = strategy.run(question).await;
        RouteResponse::Answered(Box::new(RoutedAnswer {
            outcome,
            classification: Some(label),
            fallback: false,
            narrative: None,
        }))
    }

    /// Fallback composition: Direct-SQL first, retrieval on failure.
    /// An answer is attempted twice before failure surfaces.
    pub async fn answer_with_fallback(&self, caller: &str, question: &str) -> RouteResponse {
        let admission = self.limiter.admit(caller);
        if !admission.allowed {
            return RouteResponse::RateLimited {
                retry_after: admission.retry_after,
            };
        }

        let primary = self.direct_sql.run(question).await;
        if primary.success {
            let narrative = self.enrich(question, &primary).await;
            return RouteResponse::Answered(Box::new(RoutedAnswer {
                outcome: primary,
                classification: None,
                fallback: false,
                narrative,
            }));
        }

        warn!(
            error = primary.error.as_deref().unwrap_or("unknown"),
            "direct SQL failed, falling back to retrieval"
        );
        let alternate = self.retrieval.run(question).await;
        RouteResponse::Answered(Box::new(RoutedAnswer {
            outcome: alternate,
            classification: None,
            fallback: true,
            narrative: None,
        }))
    }

    async fn enrich(&self, question: &str, outcome: &StrategyOutcome) -> Option<String> {
        let client = self.enrichment.as_ref()?;

        let Some(Answer::Rows { rows }) = &outcome.answer else {
            return None;
        };
        let sql = outcome.details.get("sql").and_then(|v| v.as_str())?;

        let mut context = String::from("SQL Query Results:\n");
        for (i, row) in rows.iter().enumerate() {
            context.push_str(&format!(
                "Row {}: {}\n",
                i + 1,
                serde_json::to_string(row).unwrap_or_default()
            ));
        }

        let prompt = format!(
            "You are a helpful assistant.\n\
             Use the following SQL query results to answer the question.\n\
             If the SQL results don't fully answer the question, indicate what additional information might be needed.\n\n\
             SQL Query: {}\n\n\
             SQL Results:\n{}\n\
             Question: {}\n\n\
             Answer:",
            sql, context, question
        );

        // Enrichment is best-effort; a failure never voids the answer.
        match timeout(self.enrichment_timeout, client.complete(&prompt)).await {
            Ok(Ok(text)) => Some(text),
            Ok(Err(e)) => {
                debug!(error = %e, "narrative enrichment failed");
                None
            }
            Err(_) => {
                debug!("narrative enrichment timed out");
                None
            }
        }
    }
}

fn label_str(label: Classification) -> &'static str {
    match label {
        Classification::Structured => "structured",
        Classification::Contextual => "contextual",
    }
}
