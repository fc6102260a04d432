use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use cold_mail_core::{
    flatten_links, ChatCompletionsChain, ColdMailPipeline, HttpPageFetcher, LlmConfig,
    ModelSpec, PortfolioStore, SeedOutcome, SenderProfile, StoreConfig,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_JOBS_URL: &str =
    "https://jobs.careers.microsoft.com/global/en/search?l=en_us&pg=1&pgSz=20&o=Relevance&flt=true&ref=cms";

#[derive(Parser)]
#[command(name = "cold-mail", version, about = "Cold email generator for careers pages")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// URL submitted when the interactive prompt is left empty
    #[arg(long, env = "DEFAULT_JOBS_URL", default_value = DEFAULT_JOBS_URL, global = true)]
    default_url: String,

    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    llm: LlmArgs,
}

#[derive(Args)]
struct StoreArgs {
    /// Portfolio CSV with Techstack and Links columns
    #[arg(long, env = "PORTFOLIO_CSV", default_value = cold_mail_core::config::DEFAULT_PORTFOLIO_CSV)]
    portfolio_csv: PathBuf,

    /// Directory holding the persisted vector collection
    #[arg(long, env = "VECTORSTORE_DIR", default_value = cold_mail_core::config::DEFAULT_PERSIST_DIR)]
    persist_dir: PathBuf,

    /// Directory holding cached embedding model artifacts
    #[arg(long, env = "MODEL_CACHE_DIR", default_value = cold_mail_core::config::DEFAULT_MODEL_CACHE)]
    model_cache: PathBuf,

    /// Delay between collection initialization attempts
    #[arg(long, default_value = "500")]
    init_retry_delay_ms: u64,
}

#[derive(Args)]
struct LlmArgs {
    /// OpenAI-compatible API base URL
    #[arg(long, env = "LLM_BASE_URL", default_value = cold_mail_core::config::DEFAULT_LLM_BASE_URL)]
    llm_base_url: String,

    /// Chat model name
    #[arg(long, env = "LLM_MODEL", default_value = cold_mail_core::config::DEFAULT_LLM_MODEL)]
    llm_model: String,

    /// API key for the LLM endpoint
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true, default_value = "")]
    api_key: String,

    /// Name used to sign the drafted emails
    #[arg(long, env = "SENDER_NAME", default_value = "Alex")]
    sender_name: String,

    /// Company the drafted emails pitch
    #[arg(long, env = "SENDER_COMPANY", default_value = "Northwind Software")]
    sender_company: String,

    /// Page fetch timeout in seconds
    #[arg(long, default_value = "30")]
    fetch_timeout_secs: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Prompt for careers page URLs until EOF or `quit`.
    Interactive,
    /// Draft emails for a single careers page and exit.
    Generate {
        #[arg(long)]
        url: String,
    },
    /// Seed the portfolio collection and report its status.
    Seed,
    /// Show the portfolio links matched for each skill.
    Query {
        /// Skills to match, e.g. --skill Python --skill React
        #[arg(long = "skill", required = true)]
        skills: Vec<String>,
    },
}

impl StoreArgs {
    fn to_config(&self) -> StoreConfig {
        StoreConfig {
            portfolio_csv: self.portfolio_csv.clone(),
            persist_dir: self.persist_dir.clone(),
            model_cache: self.model_cache.clone(),
            model: ModelSpec::default(),
            retry_delay: Duration::from_millis(self.init_retry_delay_ms),
            ..StoreConfig::default()
        }
    }
}

impl LlmArgs {
    fn build_pipeline(
        &self,
        portfolio: PortfolioStore,
    ) -> anyhow::Result<ColdMailPipeline<HttpPageFetcher, ChatCompletionsChain>> {
        let fetcher = HttpPageFetcher::from_env(Duration::from_secs(self.fetch_timeout_secs))?;
        let llm = ChatCompletionsChain::new(
            LlmConfig {
                base_url: self.llm_base_url.clone(),
                model: self.llm_model.clone(),
                api_key: self.api_key.clone(),
                ..LlmConfig::default()
            },
            SenderProfile {
                name: self.sender_name.clone(),
                company: self.sender_company.clone(),
            },
        )?;

        Ok(ColdMailPipeline::new(fetcher, llm, portfolio))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "cold-mail boot"
    );

    let mut portfolio = PortfolioStore::initialize(&cli.store.to_config()).await?;

    match cli.command.unwrap_or(Command::Interactive) {
        Command::Interactive => {
            let mut pipeline = cli.llm.build_pipeline(portfolio)?;
            run_interactive(&mut pipeline, &cli.default_url).await?;
        }
        Command::Generate { url } => {
            let mut pipeline = cli.llm.build_pipeline(portfolio)?;
            println!("{}", pipeline.submit(&url).await.render());
        }
        Command::Seed => {
            let outcome = portfolio.seed();
            let status = portfolio.status();
            match outcome {
                SeedOutcome::Seeded(count) => println!("seeded {count} portfolio entries"),
                SeedOutcome::AlreadySeeded(count) => {
                    println!("collection already holds {count} entries, nothing to do")
                }
                SeedOutcome::Unavailable => println!(
                    "portfolio store unavailable: {}",
                    status.error.as_deref().unwrap_or("seed could not run")
                ),
            }
            println!(
                "rows={} entries={} mode={} init_attempts={}",
                status.rows,
                status.entries,
                status
                    .mode
                    .map(|mode| mode.to_string())
                    .unwrap_or_else(|| "none".to_string()),
                status.init_attempts
            );
        }
        Command::Query { skills } => {
            portfolio.seed();
            let matches = portfolio.query(skills.as_slice());
            if matches.is_empty() {
                println!("no links found");
            }
            for item in &matches {
                println!("{}:", item.skill);
                for link in &item.links {
                    println!("  {}", link.links);
                }
            }
            info!(links = flatten_links(&matches).len(), "query finished");
        }
    }

    Ok(())
}

async fn run_interactive(
    pipeline: &mut ColdMailPipeline<HttpPageFetcher, ChatCompletionsChain>,
    default_url: &str,
) -> anyhow::Result<()> {
    println!("Cold Mail Generator");
    println!("Press enter to use the default URL, type `quit` to leave.");

    let stdin = io::stdin();
    let mut lines = stdin.lock();
    loop {
        print!("Enter a URL [{default_url}]: ");
        io::stdout().flush()?;

        let mut line = String::new();
        if lines.read_line(&mut line)? == 0 {
            break;
        }

        let url = match line.trim() {
            "" => default_url,
            "quit" | "exit" => break,
            other => other,
        };

        println!("{}", pipeline.submit(url).await.render());
    }

    Ok(())
}
