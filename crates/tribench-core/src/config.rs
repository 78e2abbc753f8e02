use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A benchmark suite: the questions to run and the knobs that shape
/// every run of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    pub suite: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub settings: Settings,
    pub questions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    #[serde(default)]
    pub enrich: bool,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_timeout_seconds() -> u64 {
    30
}
fn default_retrieval_k() -> usize {
    5
}
fn default_cache_ttl_seconds() -> u64 {
    30
}
fn default_max_requests() -> usize {
    10
}
fn default_window_seconds() -> u64 {
    60
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            retrieval_k: default_retrieval_k(),
            cache_ttl_seconds: default_cache_ttl_seconds(),
            max_requests: default_max_requests(),
            window_seconds: default_window_seconds(),
            enrich: false,
        }
    }
}

pub fn load_config(path: &Path) -> anyhow::Result<SuiteConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: SuiteConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    anyhow::ensure!(
        !config.questions.is_empty(),
        "suite '{}' has no questions",
        config.suite
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_minimal_suite_with_defaults() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(
            file,
            "suite: demo\nquestions:\n  - \"How many products are listed?\"\n"
        )?;

        let config = load_config(file.path())?;
        assert_eq!(config.suite, "demo");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.questions.len(), 1);
        assert_eq!(config.settings.timeout_seconds, 30);
        assert_eq!(config.settings.retrieval_k, 5);
        assert_eq!(config.settings.cache_ttl_seconds, 30);
        assert!(!config.settings.enrich);
        Ok(())
    }

    #[test]
    fn rejects_empty_question_list() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "suite: empty\nquestions: []\n")?;

        assert!(load_config(file.path()).is_err());
        Ok(())
    }

    #[test]
    fn overrides_settings() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(
            file,
            "suite: tuned\nmodel: gpt-4o\nsettings:\n  timeout_seconds: 5\n  retrieval_k: 3\n  enrich: true\nquestions:\n  - \"q\"\n"
        )?;

        let config = load_config(file.path())?;
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.settings.timeout_seconds, 5);
        assert_eq!(config.settings.retrieval_k, 3);
        assert!(config.settings.enrich);
        // untouched fields keep defaults
        assert_eq!(config.settings.max_requests, 10);
        Ok(())
    }
}
