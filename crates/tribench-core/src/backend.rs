use crate::model::Row;
use anyhow::Context;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub ty: String,
    pub nullable: bool,
    pub primary_key: bool,
    pub references: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

/// Relational backing store. Execution errors (syntax, constraint)
/// surface verbatim in the returned error.
pub trait SqlBackend: Send + Sync {
    fn list_tables(&self) -> anyhow::Result<Vec<String>>;
    fn describe(&self, table: &str) -> anyhow::Result<TableSchema>;
    fn execute(&self, sql: &str) -> anyhow::Result<Vec<Row>>;
}

#[derive(Clone)]
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path).context("failed to open sqlite dataset")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> anyhow::Result<Self> {
        let conn =
            Connection::open_in_memory().context("failed to open in-memory sqlite dataset")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }
}

impl SqlBackend for SqliteBackend {
    fn list_tables(&self) -> anyhow::Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut tables = Vec::new();
        for r in rows {
            tables.push(r?);
        }
        Ok(tables)
    }

    fn describe(&self, table: &str) -> anyhow::Result<TableSchema> {
        let conn = self.conn.lock().unwrap();

        // Foreign keys first: column name -> referenced table.
        let mut fks = std::collections::HashMap::new();
        let mut stmt = conn.prepare(&format!("PRAGMA foreign_key_list({})", table))?;
        let fk_rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(3)?, row.get::<_, String>(2)?))
        })?;
        for r in fk_rows {
            let (from, referenced) = r?;
            fks.insert(from, referenced);
        }

        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
        let col_rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(5)?,
            ))
        })?;

        let mut columns = Vec::new();
        for r in col_rows {
            let (name, ty, notnull, pk) = r?;
            let references = fks.get(&name).cloned();
            columns.push(ColumnDef {
                name,
                ty,
                nullable: notnull == 0,
                primary_key: pk > 0,
                references,
            });
        }

        if columns.is_empty() {
            anyhow::bail!("unknown table: {}", table);
        }

        Ok(TableSchema {
            name: table.to_string(),
            columns,
        })
    }

    fn execute(&self, sql: &str) -> anyhow::Result<Vec<Row>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

        let mut out = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (i, name) in columns.iter().enumerate() {
                record.insert(name.clone(), value_to_json(row.get_ref(i)?));
            }
            out.push(record);
        }
        Ok(out)
    }
}

fn value_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(t) => serde_json::Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => serde_json::Value::String(String::from_utf8_lossy(b).into_owned()),
    }
}
