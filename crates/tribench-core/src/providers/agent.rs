use async_trait::async_trait;
use serde_json::json;

/// Autonomous SQL agent service. Planning, execution and correction
/// attempts all happen on the remote side; the iteration bound is
/// enforced by the service, not by this crate.
#[async_trait]
pub trait AgentClient: Send + Sync {
    async fn solve(&self, question: &str, schema: &str) -> anyhow::Result<String>;
    fn provider_name(&self) -> &'static str;
}

/// HTTP adapter posting `{question, schema}` and expecting `{answer}`.
pub struct HttpAgentClient {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub client: reqwest::Client,
}

impl HttpAgentClient {
    pub fn new(endpoint: String, api_key: Option<String>) -> Self {
        Self {
            endpoint,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    async fn solve(&self, question: &str, schema: &str) -> anyhow::Result<String> {
        let body = json!({ "question": question, "schema": schema });

        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("agent service error: {}", error_text);
        }

        let json: serde_json::Value = resp.json().await?;
        let answer = json
            .get("answer")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("agent response missing answer"))?
            .to_string();

        Ok(answer)
    }

    fn provider_name(&self) -> &'static str {
        "http-agent"
    }
}

/// Deterministic agent for tests and offline runs: a fixed answer or
/// a fixed failure.
pub struct ScriptedAgent {
    response: Result<String, String>,
}

impl ScriptedAgent {
    pub fn answering(answer: impl Into<String>) -> Self {
        Self {
            response: Ok(answer.into()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            response: Err(message.into()),
        }
    }
}

#[async_trait]
impl AgentClient for ScriptedAgent {
    async fn solve(&self, _question: &str, _schema: &str) -> anyhow::Result<String> {
        match &self.response {
            Ok(answer) => Ok(answer.clone()),
            Err(message) => anyhow::bail!("{}", message),
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted-agent"
    }
}
