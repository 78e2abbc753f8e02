pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS batteries (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  suite TEXT NOT NULL,
  started_at TEXT NOT NULL,
  status TEXT NOT NULL,
  question_count INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS outcomes (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  battery_id INTEGER NOT NULL REFERENCES batteries(id),
  question_idx INTEGER NOT NULL,
  question TEXT NOT NULL,
  strategy TEXT NOT NULL,
  success INTEGER NOT NULL,
  elapsed_ms INTEGER NOT NULL,
  answer_json TEXT,
  error TEXT,
  details_json TEXT
);

CREATE INDEX IF NOT EXISTS idx_outcomes_battery ON outcomes(battery_id, question_idx);
"#;
