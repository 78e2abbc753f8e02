use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tribench_core::backend::{SqlBackend, SqliteBackend};
use tribench_core::cache::ResultCache;
use tribench_core::classify::QueryClassifier;
use tribench_core::config::{load_config, Settings};
use tribench_core::harness::{summarize, BenchmarkHarness};
use tribench_core::model::RouteResponse;
use tribench_core::providers::agent::{AgentClient, HttpAgentClient, ScriptedAgent};
use tribench_core::providers::llm::fake::ScriptedCompletion;
use tribench_core::providers::llm::openai::OpenAIClient;
use tribench_core::providers::llm::CompletionClient;
use tribench_core::providers::retriever::{InMemoryRetriever, Retriever};
use tribench_core::ratelimit::RateLimiter;
use tribench_core::router::{HybridRouter, StructuredRoute};
use tribench_core::schema::SchemaCache;
use tribench_core::storage::store::Store;
use tribench_core::strategy::{AgentStrategy, DirectSqlStrategy, RetrievalStrategy, Strategy};

#[derive(Parser)]
#[command(
    name = "tribench",
    version,
    about = "Routes and benchmarks natural-language questions over a SQL dataset"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every question in the suite through every strategy.
    Bench(BenchArgs),
    /// Answer a single question through the hybrid router.
    Ask(AskArgs),
    /// Re-render the report for a stored battery.
    Report(ReportArgs),
    Version,
}

#[derive(Parser, Clone)]
struct ProviderArgs {
    /// sqlite dataset the strategies query
    #[arg(long, default_value = "data.db")]
    dataset: PathBuf,

    /// completion provider: openai|scripted
    #[arg(long, default_value = "openai")]
    provider: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, default_value = "gpt-4o-mini")]
    model: String,

    /// autonomous agent service; without it the agent strategy reports
    /// a failure outcome instead of answering
    #[arg(long)]
    agent_endpoint: Option<String>,
}

#[derive(Parser, Clone)]
struct BenchArgs {
    #[arg(long, default_value = "tribench.yaml")]
    config: PathBuf,
    #[arg(long, default_value = ".tribench/bench.db")]
    db: PathBuf,
    #[arg(long, default_value = "benchmark_report.md")]
    report: PathBuf,

    /// also write accumulated battery JSON here after every question
    #[arg(long)]
    out_dir: Option<PathBuf>,

    #[command(flatten)]
    providers: ProviderArgs,
}

#[derive(Parser, Clone)]
struct AskArgs {
    question: String,

    /// suite config supplying settings (timeouts, rate limits,
    /// enrichment); defaults apply without it
    #[arg(long)]
    config: Option<PathBuf>,

    /// routing policy: fallback|classify
    #[arg(long, default_value = "fallback")]
    policy: String,

    /// runner for structured questions under the classify policy:
    /// direct_sql|agent
    #[arg(long, default_value = "direct_sql")]
    structured_route: String,

    /// caller id for rate limiting
    #[arg(long, default_value = "cli")]
    caller: String,

    /// turn successful SQL rows into a narrative answer
    #[arg(long)]
    enrich: bool,

    #[command(flatten)]
    providers: ProviderArgs,
}

#[derive(Parser, Clone)]
struct ReportArgs {
    #[arg(long, default_value = ".tribench/bench.db")]
    db: PathBuf,
    #[arg(long, default_value = "benchmark_report.md")]
    out: PathBuf,

    /// battery id; defaults to the most recent
    #[arg(long)]
    battery: Option<i64>,
}

mod exit_codes {
    pub const OK: i32 = 0;
    pub const ANSWER_FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
    pub const RATE_LIMITED: i32 = 3;
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("fatal: {e:?}");
            exit_codes::CONFIG_ERROR
        }
    };
    std::process::exit(code);
}

async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Bench(args) => cmd_bench(args).await,
        Command::Ask(args) => cmd_ask(args).await,
        Command::Report(args) => cmd_report(args).await,
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
    }
}

async fn cmd_bench(args: BenchArgs) -> anyhow::Result<i32> {
    let cfg = load_config(&args.config)?;
    ensure_parent_dir(&args.db)?;

    let store = Store::open(&args.db)?;
    store.init_schema()?;

    let pipeline = build_pipeline(&args.providers, &cfg.model, &cfg.settings).await?;
    let mut harness = BenchmarkHarness::new(
        cfg.suite.clone(),
        vec![
            pipeline.agent.clone(),
            pipeline.direct_sql.clone(),
            pipeline.retrieval.clone(),
        ],
        store,
    );
    if let Some(dir) = &args.out_dir {
        harness = harness.with_artifact_dir(dir);
    }

    let artifacts = harness.run_battery(&cfg.questions).await?;
    let summary = summarize(&artifacts.records);

    tribench_core::report::console::print_summary(&summary, &artifacts.records);

    ensure_parent_dir(&args.report)?;
    let markdown = tribench_core::report::markdown::render(&summary, &artifacts.records);
    std::fs::write(&args.report, markdown)?;
    info!(report = %args.report.display(), "report written");

    Ok(exit_codes::OK)
}

async fn cmd_ask(args: AskArgs) -> anyhow::Result<i32> {
    let (settings, model) = match &args.config {
        Some(path) => {
            let cfg = load_config(path)?;
            (cfg.settings, cfg.model)
        }
        None => (Settings::default(), args.providers.model.clone()),
    };
    let pipeline = build_pipeline(&args.providers, &model, &settings).await?;
    let timeout = Duration::from_secs(settings.timeout_seconds);

    let classifier = QueryClassifier::new(pipeline.client.clone(), timeout);
    let limiter = Arc::new(RateLimiter::new(
        settings.max_requests,
        Duration::from_secs(settings.window_seconds),
    ));
    let structured_route = match args.structured_route.as_str() {
        "direct_sql" => StructuredRoute::DirectSql,
        "agent" => StructuredRoute::Agent,
        other => anyhow::bail!(
            "unknown structured route: {} (expected direct_sql|agent)",
            other
        ),
    };

    let mut router = HybridRouter::new(
        classifier,
        pipeline.agent,
        pipeline.direct_sql,
        pipeline.retrieval,
        limiter,
    )
    .route_structured_to(structured_route);
    if args.enrich || settings.enrich {
        router = router.with_enrichment(pipeline.client.clone(), timeout);
    }

    let response = match args.policy.as_str() {
        "classify" => router.route(&args.caller, &args.question).await,
        "fallback" => router.answer_with_fallback(&args.caller, &args.question).await,
        other => anyhow::bail!("unknown policy: {} (expected fallback|classify)", other),
    };

    match response {
        RouteResponse::Answered(answer) => {
            println!("{}", serde_json::to_string_pretty(&answer)?);
            if answer.outcome.success {
                Ok(exit_codes::OK)
            } else {
                Ok(exit_codes::ANSWER_FAILED)
            }
        }
        RouteResponse::RateLimited { retry_after } => {
            eprintln!("rate limited; retry in {}s", retry_after.as_secs());
            Ok(exit_codes::RATE_LIMITED)
        }
    }
}

async fn cmd_report(args: ReportArgs) -> anyhow::Result<i32> {
    let store = Store::open(&args.db)?;
    store.init_schema()?;

    let battery_id = match args.battery {
        Some(id) => id,
        None => store
            .latest_battery()?
            .ok_or_else(|| anyhow::anyhow!("no batteries recorded in {}", args.db.display()))?,
    };

    let records = store.fetch_battery(battery_id)?;
    anyhow::ensure!(!records.is_empty(), "battery {} has no outcomes", battery_id);

    let summary = summarize(&records);
    tribench_core::report::console::print_summary(&summary, &records);

    ensure_parent_dir(&args.out)?;
    let markdown = tribench_core::report::markdown::render(&summary, &records);
    std::fs::write(&args.out, markdown)?;
    info!(report = %args.out.display(), battery_id, "report written");

    Ok(exit_codes::OK)
}

struct Pipeline {
    client: Arc<dyn CompletionClient>,
    agent: Arc<dyn Strategy>,
    direct_sql: Arc<dyn Strategy>,
    retrieval: Arc<dyn Strategy>,
}

async fn build_pipeline(
    providers: &ProviderArgs,
    model: &str,
    settings: &Settings,
) -> anyhow::Result<Pipeline> {
    let backend: Arc<dyn SqlBackend> = Arc::new(SqliteBackend::open(&providers.dataset)?);
    let schema = Arc::new(SchemaCache::new(backend.clone()));
    let cache = Arc::new(ResultCache::with_ttl(
        backend.clone(),
        Duration::from_secs(settings.cache_ttl_seconds),
    ));
    let timeout = Duration::from_secs(settings.timeout_seconds);

    let retriever: Arc<dyn Retriever> = Arc::new(InMemoryRetriever::new());
    tribench_core::corpus::index_backing_rows(backend.as_ref(), retriever.as_ref()).await?;

    let client = build_client(providers, model)?;

    let agent_client: Arc<dyn AgentClient> = match &providers.agent_endpoint {
        Some(endpoint) => Arc::new(HttpAgentClient::new(
            endpoint.clone(),
            providers.api_key.clone(),
        )),
        None => Arc::new(ScriptedAgent::failing("agent endpoint not configured")),
    };

    let table_retriever: Arc<dyn Retriever> = Arc::new(InMemoryRetriever::new());
    let agent = Arc::new(
        AgentStrategy::new(agent_client, schema.clone(), timeout)
            .with_table_narrowing(table_retriever, settings.retrieval_k),
    );
    let direct_sql = Arc::new(DirectSqlStrategy::new(
        client.clone(),
        schema.clone(),
        cache,
        timeout,
    ));
    let retrieval = Arc::new(
        RetrievalStrategy::new(client.clone(), retriever, schema, timeout)
            .with_passages(settings.retrieval_k),
    );

    Ok(Pipeline {
        client,
        agent,
        direct_sql,
        retrieval,
    })
}

fn build_client(providers: &ProviderArgs, model: &str) -> anyhow::Result<Arc<dyn CompletionClient>> {
    match providers.provider.as_str() {
        "openai" => {
            let api_key = providers
                .api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("--api-key (or OPENAI_API_KEY) is required for the openai provider"))?;
            Ok(Arc::new(OpenAIClient::new(
                model.to_string(),
                api_key,
                0.0,
                1024,
            )))
        }
        // Offline smoke runs: classify everything as structured and
        // emit a trivial but valid query.
        "scripted" => Ok(Arc::new(
            ScriptedCompletion::new("no completion service configured")
                .on("Classification:", "sql")
                .on(
                    "SQL Query:",
                    "```sql\nSELECT name FROM sqlite_master WHERE type = 'table'\n```",
                ),
        )),
        other => anyhow::bail!("unknown provider: {} (expected openai|scripted)", other),
    }
}

fn ensure_parent_dir(path: &std::path::Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn ask_parses_policy_and_enrich_flags() {
        let cli = Cli::try_parse_from([
            "tribench",
            "ask",
            "how many products?",
            "--policy",
            "classify",
            "--enrich",
            "--provider",
            "scripted",
        ])
        .unwrap();
        let Command::Ask(args) = cli.cmd else {
            panic!("expected ask");
        };
        assert_eq!(args.question, "how many products?");
        assert_eq!(args.policy, "classify");
        assert!(args.enrich);
        assert_eq!(args.providers.provider, "scripted");
    }

    #[test]
    fn openai_provider_requires_an_api_key() {
        let providers = ProviderArgs {
            dataset: PathBuf::from("data.db"),
            provider: "openai".into(),
            api_key: None,
            model: "gpt-4o-mini".into(),
            agent_endpoint: None,
        };
        assert!(build_client(&providers, "gpt-4o-mini").is_err());
    }

    #[test]
    fn scripted_provider_needs_no_key_and_unknown_is_rejected() {
        let mut providers = ProviderArgs {
            dataset: PathBuf::from("data.db"),
            provider: "scripted".into(),
            api_key: None,
            model: "gpt-4o-mini".into(),
            agent_endpoint: None,
        };
        assert!(build_client(&providers, "gpt-4o-mini").is_ok());

        providers.provider = "mystery".into();
        assert!(build_client(&providers, "gpt-4o-mini").is_err());
    }

    #[test]
    fn ensure_parent_dir_creates_missing_directories() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let nested = dir.path().join("a/b/report.md");

        ensure_parent_dir(&nested)?;
        assert!(nested.parent().unwrap().is_dir());

        // bare file names have no parent to create
        ensure_parent_dir(std::path::Path::new("report.md"))?;
        Ok(())
    }
}
