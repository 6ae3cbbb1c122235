//! CLI command definitions, routing, and tracing setup.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use octochat_core::{
    BuildReport, ConversationEvent, Pipeline, ProgressReporter, Responder, StatusReport,
};
use octochat_lex::LexModelClient;
use octochat_qnamaker::QnaMakerClient;
use octochat_shared::{
    AppConfig, Stage, derive_bot_name, init_config, load_config, load_config_from,
    platform_auth_token, response_table_name, validate_api_key,
};
use octochat_storage::{StatusTracker, Storage};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// octochat: turn an FAQ page into a published chatbot.
#[derive(Parser)]
#[command(
    name = "octochat",
    version,
    about = "Provision and tear down FAQ chatbots from a knowledge-base URL.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.octochat/octochat.toml.
    #[arg(long, global = true, env = "OCTOCHAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print reports as JSON instead of a summary.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Extract the FAQ, store its answers, and publish the bot.
    ///
    /// Exit codes: 0 built, 1 already exists, 2 response table not ready,
    /// 3 alias not assigned.
    Build {
        /// FAQ page URL.
        url: String,
    },

    /// Remove the bot, its intents, and its response table.
    Delete {
        /// FAQ page URL the bot was built from.
        url: String,
    },

    /// Show the lifecycle stage of the bot for a URL.
    Status {
        /// FAQ page URL.
        url: String,
    },

    /// Answer one conversation event (JSON) from the response tables.
    Respond {
        /// Event file; reads stdin when omitted.
        #[arg(long)]
        event: Option<PathBuf>,
    },

    /// Print the bot and response table names derived from a URL.
    Name {
        /// FAQ page URL.
        url: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "octochat=info",
        1 => "octochat=debug",
        _ => "octochat=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so `respond` and `--json` keep stdout parseable.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command and return the process exit code.
pub(crate) async fn run(cli: Cli) -> Result<u8> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Build { url } => cmd_build(config_path, &url, cli.json).await,
        Command::Delete { url } => cmd_delete(config_path, &url, cli.json).await.map(|()| 0),
        Command::Status { url } => cmd_status(config_path, &url, cli.json).await.map(|()| 0),
        Command::Respond { event } => cmd_respond(config_path, event.as_deref()).await.map(|()| 0),
        Command::Name { url } => cmd_name(&url).map(|()| 0),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().map(|()| 0),
            ConfigAction::Show => cmd_config_show(config_path).map(|()| 0),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

type CliPipeline = Pipeline<QnaMakerClient, LexModelClient, Arc<Storage>, Arc<Storage>>;

/// Wire the HTTP clients and the local store into a pipeline.
async fn open_pipeline(config: &AppConfig) -> Result<CliPipeline> {
    let api_key = validate_api_key(config)?;
    let knowledge_base = QnaMakerClient::new(&config.qnamaker, api_key)?;
    let platform = LexModelClient::new(&config.platform, platform_auth_token(config)?)?;

    let db_path = config.store.resolved_path()?;
    let storage = Arc::new(
        Storage::open(&db_path)
            .await
            .wrap_err_with(|| format!("opening store at {}", db_path.display()))?,
    );

    Ok(Pipeline::new(
        knowledge_base,
        platform,
        storage.clone(),
        storage,
        config,
    ))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_build(config_path: Option<&Path>, url: &str, json: bool) -> Result<u8> {
    let config = resolve_config(config_path)?;
    let pipeline = open_pipeline(&config).await?;

    info!(url, "building bot");
    let reporter = CliProgress::new()?;
    let result = pipeline.build(url, &reporter).await;
    reporter.clear();
    let report = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_build_report(&report);
    }
    Ok(report.outcome.code())
}

fn print_build_report(report: &BuildReport) {
    let details = &report.details;
    println!();
    println!("  {}", report.outcome.message());
    println!("  Bot:      {}", report.bot_name);
    println!("  Run:      {}", report.run_id);
    println!("  Intents:  {}", details.intents);
    if let Some(version) = &details.bot_version {
        println!("  Version:  {version}");
    }
    if !details.duplicate_intents.is_empty() {
        println!("  Duplicate intent names: {}", details.duplicate_intents.join(", "));
    }
    for failure in &details.failed_items {
        println!("  Failed:   {} ({})", failure.item, failure.error);
    }
    println!("  Time:     {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

async fn cmd_delete(config_path: Option<&Path>, url: &str, json: bool) -> Result<()> {
    let config = resolve_config(config_path)?;
    let pipeline = open_pipeline(&config).await?;

    info!(url, "deleting bot");
    let reporter = CliProgress::new()?;
    let result = pipeline.delete(url, &reporter).await;
    reporter.clear();
    let report = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        println!("  Bot {} deleted.", report.bot_name);
        println!("  Intents removed: {}", report.intents_deleted);
        println!("  Time:            {:.1}s", report.elapsed.as_secs_f64());
        println!();
    }
    Ok(())
}

async fn cmd_status(config_path: Option<&Path>, url: &str, json: bool) -> Result<()> {
    let config = resolve_config(config_path)?;
    let db_path = config.store.resolved_path()?;
    let storage = Arc::new(Storage::open(&db_path).await?);

    // Status needs neither remote service, so skip the credential checks.
    let bot_name = derive_bot_name(url)?;
    let record = StatusTracker::new(storage).record(&bot_name).await?;
    let report = StatusReport::from_record(bot_name, record);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match &report.faq_url {
            Some(faq_url) => println!("{}: {} ({faq_url})", report.bot_name, report.stage),
            None => println!("{}: {}", report.bot_name, report.stage),
        }
    }
    Ok(())
}

async fn cmd_respond(config_path: Option<&Path>, event_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;

    let raw = match event_path {
        Some(path) => std::fs::read_to_string(path)
            .wrap_err_with(|| format!("reading event from {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .wrap_err("reading event from stdin")?;
            buf
        }
    };
    let event: ConversationEvent =
        serde_json::from_str(&raw).wrap_err("event is not a conversation event")?;

    let db_path = config.store.resolved_path()?;
    let storage = Storage::open_readonly(&db_path).await?;
    let response = Responder::new(storage).respond(&event).await;

    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

fn cmd_name(url: &str) -> Result<()> {
    let bot_name = derive_bot_name(url)?;
    println!("bot:   {bot_name}");
    println!("table: {}", response_table_name(&bot_name));
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Result<Self> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")?
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Ok(Self { spinner })
    }

    fn clear(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn stage(&self, bot_name: &str, stage: Stage) {
        self.spinner.println(format!("  {bot_name} -> {stage}"));
    }

    fn done(&self, _report: &BuildReport) {
        self.spinner.finish_and_clear();
    }
}
