use crate::model::{Answer, BenchmarkRecord, StrategyKind, StrategyOutcome};
use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Durable battery results: machine-readable, re-parseable for
/// re-aggregation without re-running strategies.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path).context("failed to open results db")?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory results db")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(crate::storage::schema::DDL)?;
        Ok(())
    }

    pub fn create_battery(&self, suite: &str, question_count: usize) -> anyhow::Result<i64> {
        let conn = self.conn.lock().unwrap();
        let started_at = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO batteries(suite, started_at, status, question_count) VALUES (?1, ?2, ?3, ?4)",
            params![suite, started_at, "running", question_count as i64],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn finalize_battery(&self, battery_id: i64, status: &str) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE batteries SET status=?1 WHERE id=?2",
            params![status, battery_id],
        )?;
        Ok(())
    }

    /// Inserts every outcome of one benchmarked question in a single
    /// transaction, keyed by its position in the battery.
    pub fn insert_record(
        &self,
        battery_id: i64,
        question_idx: usize,
        record: &BenchmarkRecord,
    ) -> anyhow::Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO outcomes(battery_id, question_idx, question, strategy, success, elapsed_ms, answer_json, error, details_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for outcome in &record.outcomes {
                let answer_json = outcome
                    .answer
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;
                stmt.execute(params![
                    battery_id,
                    question_idx as i64,
                    record.question,
                    outcome.strategy.as_str(),
                    outcome.success as i64,
                    outcome.elapsed_ms as i64,
                    answer_json,
                    outcome.error,
                    serde_json::to_string(&outcome.details)?,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn latest_battery(&self) -> anyhow::Result<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        let id = conn
            .query_row(
                "SELECT id FROM batteries ORDER BY id DESC LIMIT 1",
                [],
                |r| r.get::<_, i64>(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Rehydrates a battery's records in question order, outcomes in
    /// the order they ran.
    pub fn fetch_battery(&self, battery_id: i64) -> anyhow::Result<Vec<BenchmarkRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT question_idx, question, strategy, success, elapsed_ms, answer_json, error, details_json
             FROM outcomes WHERE battery_id = ?1
             ORDER BY question_idx ASC, id ASC",
        )?;

        let rows = stmt.query_map(params![battery_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, Option<String>>(7)?,
            ))
        })?;

        let mut records: Vec<(i64, BenchmarkRecord)> = Vec::new();
        for r in rows {
            let (idx, question, strategy, success, elapsed_ms, answer_json, error, details_json) =
                r?;

            let strategy = StrategyKind::parse(&strategy)
                .ok_or_else(|| anyhow::anyhow!("unknown strategy in store: {}", strategy))?;
            let answer: Option<Answer> = answer_json
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?;
            let details: serde_json::Value = details_json
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?
                .unwrap_or_else(|| serde_json::json!({}));

            let outcome = StrategyOutcome {
                question: question.clone(),
                strategy,
                success: success != 0,
                answer,
                error,
                elapsed_ms: elapsed_ms as u64,
                details,
            };

            let same_question = matches!(records.last(), Some((last_idx, _)) if *last_idx == idx);
            if same_question {
                if let Some((_, record)) = records.last_mut() {
                    record.outcomes.push(outcome);
                }
            } else {
                records.push((
                    idx,
                    BenchmarkRecord {
                        question,
                        outcomes: vec![outcome],
                    },
                ));
            }
        }

        Ok(records.into_iter().map(|(_, r)| r).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Answer;

    fn sample_record(question: &str) -> BenchmarkRecord {
        BenchmarkRecord {
            question: question.to_string(),
            outcomes: vec![
                StrategyOutcome::failed(question, StrategyKind::Agent, "offline".into(), 12),
                StrategyOutcome::ok(
                    question,
                    StrategyKind::DirectSql,
                    Answer::Rows { rows: Vec::new() },
                    7,
                ),
                StrategyOutcome::ok(
                    question,
                    StrategyKind::Retrieval,
                    Answer::Text {
                        text: "ok".into(),
                    },
                    20,
                ),
            ],
        }
    }

    #[test]
    fn round_trips_a_battery_in_order() -> anyhow::Result<()> {
        let store = Store::memory()?;
        store.init_schema()?;

        let id = store.create_battery("demo", 2)?;
        store.insert_record(id, 0, &sample_record("first"))?;
        store.insert_record(id, 1, &sample_record("second"))?;
        store.finalize_battery(id, "completed")?;

        let records = store.fetch_battery(id)?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].question, "first");
        assert_eq!(records[1].question, "second");
        assert_eq!(records[0].outcomes.len(), 3);
        assert_eq!(records[0].outcomes[0].strategy, StrategyKind::Agent);
        assert!(!records[0].outcomes[0].success);
        assert_eq!(records[0].outcomes[1].strategy, StrategyKind::DirectSql);
        assert_eq!(records[0].outcomes[2].elapsed_ms, 20);

        assert_eq!(store.latest_battery()?, Some(id));
        Ok(())
    }

    #[test]
    fn empty_store_has_no_latest_battery() -> anyhow::Result<()> {
        let store = Store::memory()?;
        store.init_schema()?;
        assert_eq!(store.latest_battery()?, None);
        Ok(())
    }

    #[test]
    fn latest_battery_propagates_schema_errors() -> anyhow::Result<()> {
        // schema never initialized: a missing table is an error, not
        // an empty result
        let store = Store::memory()?;
        assert!(store.latest_battery().is_err());
        Ok(())
    }
}
