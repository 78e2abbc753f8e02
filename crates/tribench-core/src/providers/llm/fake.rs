use super::CompletionClient;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Deterministic completion client for tests and offline runs.
/// Responds with the first rule whose needle appears in the prompt,
/// falling back to a fixed default.
pub struct ScriptedCompletion {
    rules: Vec<(String, String)>,
    fallback: String,
    calls: AtomicUsize,
}

impl ScriptedCompletion {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            fallback: fallback.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn on(mut self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules.push((needle.into(), response.into()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        for (needle, response) in &self.rules {
            if prompt.contains(needle.as_str()) {
                return Ok(response.clone());
            }
        }
        Ok(self.fallback.clone())
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

/// Completion client that always fails, for exercising failure paths.
pub struct FailingCompletion {
    pub message: String,
}

impl FailingCompletion {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl CompletionClient for FailingCompletion {
    async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
        anyhow::bail!("{}", self.message)
    }

    fn provider_name(&self) -> &'static str {
        "failing"
    }
}
