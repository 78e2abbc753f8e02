use crate::backend::{SqlBackend, TableSchema};
use crate::providers::retriever::{Document, Retriever};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Memoized schema descriptions. Schema is assumed static for the
/// process lifetime; `invalidate` clears the memo explicitly.
pub struct SchemaCache {
    backend: Arc<dyn SqlBackend>,
    full: Mutex<Option<String>>,
    tables: Mutex<Option<BTreeMap<String, String>>>,
}

impl SchemaCache {
    pub fn new(backend: Arc<dyn SqlBackend>) -> Self {
        Self {
            backend,
            full: Mutex::new(None),
            tables: Mutex::new(None),
        }
    }

    /// Whole-database schema text, computed once on first call.
    pub fn full_schema(&self) -> anyhow::Result<String> {
        {
            let memo = self.full.lock().unwrap();
            if let Some(text) = memo.as_ref() {
                return Ok(text.clone());
            }
        }
        let defs = self.table_definitions()?;
        let text = defs.values().cloned().collect::<Vec<_>>().join("\n\n");
        *self.full.lock().unwrap() = Some(text.clone());
        Ok(text)
    }

    /// Per-table definition text, computed once on first call.
    pub fn table_definitions(&self) -> anyhow::Result<BTreeMap<String, String>> {
        {
            let memo = self.tables.lock().unwrap();
            if let Some(defs) = memo.as_ref() {
                return Ok(defs.clone());
            }
        }

        let mut defs = BTreeMap::new();
        for table in self.backend.list_tables()? {
            let schema = self.backend.describe(&table)?;
            defs.insert(table, render_definition(&schema));
        }

        *self.tables.lock().unwrap() = Some(defs.clone());
        Ok(defs)
    }

    pub fn invalidate(&self) {
        *self.full.lock().unwrap() = None;
        *self.tables.lock().unwrap() = None;
    }

    /// The k tables most relevant to a question, ranked by the
    /// retriever over per-table definition documents. If the retriever
    /// is unavailable, falls back to all tables, unordered.
    pub async fn relevant_tables(
        &self,
        retriever: &dyn Retriever,
        question: &str,
        k: usize,
    ) -> anyhow::Result<Vec<String>> {
        let defs = self.table_definitions()?;

        let documents: Vec<Document> = defs
            .iter()
            .map(|(name, definition)| {
                Document::new(definition.clone(), serde_json::json!({ "table": name }))
            })
            .collect();

        let ranked = match index_and_search(retriever, documents, question, k).await {
            Ok(hits) if !hits.is_empty() => hits,
            Ok(_) => {
                return Ok(defs.keys().cloned().collect());
            }
            Err(e) => {
                warn!(error = %e, "table retriever unavailable, using all tables");
                return Ok(defs.keys().cloned().collect());
            }
        };

        let mut tables = Vec::new();
        for (doc, _score) in ranked {
            if let Some(name) = doc.metadata.get("table").and_then(|v| v.as_str()) {
                if !tables.iter().any(|t| t == name) {
                    tables.push(name.to_string());
                }
            }
        }
        Ok(tables)
    }
}

async fn index_and_search(
    retriever: &dyn Retriever,
    documents: Vec<Document>,
    question: &str,
    k: usize,
) -> anyhow::Result<Vec<(Document, f64)>> {
    retriever.index(documents).await?;
    retriever.search(question, k).await
}

fn render_definition(schema: &TableSchema) -> String {
    let mut cols = Vec::new();
    for col in &schema.columns {
        let mut parts = vec![format!("  {} {}", col.name, col.ty)];
        if !col.nullable {
            parts.push("NOT NULL".to_string());
        }
        if col.primary_key {
            parts.push("PRIMARY KEY".to_string());
        }
        if let Some(referenced) = &col.references {
            parts.push(format!("REFERENCES {}", referenced));
        }
        cols.push(parts.join(" "));
    }
    format!("CREATE TABLE {} (\n{}\n);", schema.name, cols.join(",\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ColumnDef;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingBackend {
        describes: AtomicUsize,
    }

    impl SqlBackend for CountingBackend {
        fn list_tables(&self) -> anyhow::Result<Vec<String>> {
            Ok(vec!["platforms".into(), "products".into()])
        }

        fn describe(&self, table: &str) -> anyhow::Result<TableSchema> {
            self.describes.fetch_add(1, Ordering::SeqCst);
            Ok(TableSchema {
                name: table.to_string(),
                columns: vec![ColumnDef {
                    name: "id".into(),
                    ty: "INTEGER".into(),
                    nullable: false,
                    primary_key: true,
                    references: None,
                }],
            })
        }

        fn execute(&self, _sql: &str) -> anyhow::Result<Vec<crate::model::Row>> {
            Ok(Vec::new())
        }
    }

    struct UnavailableRetriever;

    #[async_trait]
    impl Retriever for UnavailableRetriever {
        async fn index(&self, _documents: Vec<Document>) -> anyhow::Result<()> {
            anyhow::bail!("index offline")
        }

        async fn search(&self, _query: &str, _k: usize) -> anyhow::Result<Vec<(Document, f64)>> {
            anyhow::bail!("index offline")
        }
    }

    #[test]
    fn definitions_computed_once() {
        let backend = Arc::new(CountingBackend {
            describes: AtomicUsize::new(0),
        });
        let cache = SchemaCache::new(backend.clone());

        cache.table_definitions().unwrap();
        cache.full_schema().unwrap();
        cache.table_definitions().unwrap();

        assert_eq!(backend.describes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn invalidate_forces_recompute() {
        let backend = Arc::new(CountingBackend {
            describes: AtomicUsize::new(0),
        });
        let cache = SchemaCache::new(backend.clone());

        cache.table_definitions().unwrap();
        cache.invalidate();
        cache.table_definitions().unwrap();

        assert_eq!(backend.describes.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn relevant_tables_falls_back_to_all_when_retriever_fails() {
        let backend = Arc::new(CountingBackend {
            describes: AtomicUsize::new(0),
        });
        let cache = SchemaCache::new(backend);

        let tables = cache
            .relevant_tables(&UnavailableRetriever, "cheapest onions", 1)
            .await
            .unwrap();
        assert_eq!(tables, vec!["platforms".to_string(), "products".to_string()]);
    }

    #[tokio::test]
    async fn relevant_tables_ranks_with_working_retriever() {
        let backend = Arc::new(CountingBackend {
            describes: AtomicUsize::new(0),
        });
        let cache = SchemaCache::new(backend);
        let retriever = crate::providers::retriever::InMemoryRetriever::new();

        let tables = cache
            .relevant_tables(&retriever, "platforms", 1)
            .await
            .unwrap();
        assert_eq!(tables, vec!["platforms".to_string()]);
    }
}
