//! Builds the retrieval corpus: every row of the backing store
//! serialized into a plain-text passage, one document per row.

use crate::backend::SqlBackend;
use crate::providers::retriever::{Document, Retriever};
use tracing::info;

/// Serializes all rows of all tables into passages and indexes them.
/// Returns the number of documents indexed.
pub async fn index_backing_rows(
    backend: &dyn SqlBackend,
    retriever: &dyn Retriever,
) -> anyhow::Result<usize> {
    let mut documents = Vec::new();

    for table in backend.list_tables()? {
        let rows = backend.execute(&format!("SELECT * FROM {}", table))?;
        for row in rows {
            let mut content = format!("Table: {}\n", table);
            for (column, value) in &row {
                content.push_str(&format!("{}: {}\n", column, render_scalar(value)));
            }
            documents.push(Document::new(content, serde_json::json!({ "source": table })));
        }
    }

    let count = documents.len();
    retriever.index(documents).await?;
    info!(documents = count, "indexed retrieval corpus");
    Ok(count)
}

fn render_scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
