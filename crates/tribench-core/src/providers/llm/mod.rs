use async_trait::async_trait;

/// Text-completion service. May fail or time out; callers own the
/// timeout and convert failures into strategy outcomes.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
    fn provider_name(&self) -> &'static str;
}

pub mod fake;
pub mod openai;
