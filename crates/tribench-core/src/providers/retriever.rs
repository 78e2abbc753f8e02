use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Document {
    pub fn new(content: impl Into<String>, metadata: serde_json::Value) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// Vector similarity index. `index` replaces the stored corpus;
/// `search` returns the k most similar documents, best first.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn index(&self, documents: Vec<Document>) -> anyhow::Result<()>;
    async fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<(Document, f64)>>;
}

/// In-process lexical retriever: bag-of-words term frequencies with
/// cosine similarity. No external service, fully deterministic.
pub struct InMemoryRetriever {
    docs: tokio::sync::Mutex<Vec<(Document, HashMap<String, f64>)>>,
}

impl InMemoryRetriever {
    pub fn new() -> Self {
        Self {
            docs: tokio::sync::Mutex::new(Vec::new()),
        }
    }
}

impl Default for InMemoryRetriever {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Retriever for InMemoryRetriever {
    async fn index(&self, documents: Vec<Document>) -> anyhow::Result<()> {
        let prepared = documents
            .into_iter()
            .map(|d| {
                let terms = term_vector(&d.content);
                (d, terms)
            })
            .collect();
        *self.docs.lock().await = prepared;
        Ok(())
    }

    async fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<(Document, f64)>> {
        let query_terms = term_vector(query);
        let docs = self.docs.lock().await;

        let mut scored: Vec<(Document, f64)> = docs
            .iter()
            .map(|(doc, terms)| (doc.clone(), cosine(&query_terms, terms)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

fn term_vector(text: &str) -> HashMap<String, f64> {
    let mut terms: HashMap<String, f64> = HashMap::new();
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        *terms.entry(token.to_lowercase()).or_insert(0.0) += 1.0;
    }
    terms
}

fn cosine(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f64 {
    let mut dot = 0.0;
    for (term, x) in a {
        if let Some(y) = b.get(term) {
            dot += x * y;
        }
    }
    let na: f64 = a.values().map(|x| x * x).sum::<f64>().sqrt();
    let nb: f64 = b.values().map(|x| x * x).sum::<f64>().sqrt();
    let denom = na * nb;
    if denom == 0.0 {
        return 0.0;
    }
    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_ranks_overlapping_document_first() -> anyhow::Result<()> {
        let retriever = InMemoryRetriever::new();
        retriever
            .index(vec![
                Document::new("Table: platforms\nname: Blinkit", serde_json::json!({})),
                Document::new("Table: products\nname: Onion", serde_json::json!({})),
            ])
            .await?;

        let hits = retriever.search("cheapest onion price", 1).await?;
        assert_eq!(hits.len(), 1);
        assert!(hits[0].0.content.contains("Onion"));
        assert!(hits[0].1 > 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn index_replaces_previous_corpus() -> anyhow::Result<()> {
        let retriever = InMemoryRetriever::new();
        retriever
            .index(vec![Document::new("first corpus", serde_json::json!({}))])
            .await?;
        retriever
            .index(vec![Document::new("second corpus", serde_json::json!({}))])
            .await?;

        let hits = retriever.search("corpus", 10).await?;
        assert_eq!(hits.len(), 1);
        assert!(hits[0].0.content.contains("second"));
        Ok(())
    }

    #[test]
    fn cosine_of_disjoint_texts_is_zero() {
        let a = term_vector("alpha beta");
        let b = term_vector("gamma delta");
        assert_eq!(cosine(&a, &b), 0.0);
    }
}
