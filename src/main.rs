use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use notebook_agent::config::{self, LlmBackend, Settings};
use notebook_agent::engine::agent::Agent;
use notebook_agent::engine::editor::NotebookEditor;
use notebook_agent::engine::registry::ServerRegistry;
use notebook_agent::engine::store::NotebookStore;
use notebook_agent::server::{self, agent_api, notebook_api};

#[derive(Parser)]
#[command(name = "notebook-agent")]
#[command(about = "Edit Jupyter notebooks from natural-language requests", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (defaults to <config dir>/notebook_agent/settings.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the notebook mutation API
    Notebook(NotebookArgs),

    /// Serve the agent API
    Agent(AgentArgs),
}

#[derive(Args)]
struct NotebookArgs {
    /// Listen address
    #[arg(long)]
    bind: Option<String>,

    /// Directory notebook names are resolved against
    #[arg(long)]
    notebook_dir: Option<PathBuf>,
}

#[derive(Args)]
struct AgentArgs {
    /// Listen address
    #[arg(long)]
    bind: Option<String>,

    /// Model endpoint URL
    #[arg(long)]
    llm_url: Option<String>,

    /// Model backend protocol
    #[arg(long, value_enum)]
    llm_backend: Option<LlmBackend>,

    /// Model name
    #[arg(long)]
    model: Option<String>,

    /// Notebook server to register at startup (repeatable)
    #[arg(long = "connect")]
    connect: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let settings = config::load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Notebook(args) => run_notebook(args, settings).await,
        Commands::Agent(args) => run_agent(args, settings).await,
    }
}

async fn run_notebook(args: NotebookArgs, mut settings: Settings) -> Result<()> {
    if let Some(bind) = args.bind {
        settings.notebook_bind = bind;
    }
    if let Some(dir) = args.notebook_dir {
        settings.notebook_dir = dir;
    }

    let store = NotebookStore::new(&settings.notebook_dir, settings.store_options());
    log::info!("Notebooks are stored under {}", store.root().display());
    let app = notebook_api::router(NotebookEditor::new(store));

    server::serve(app, &settings.notebook_bind, "notebook API").await
}

async fn run_agent(args: AgentArgs, mut settings: Settings) -> Result<()> {
    if let Some(bind) = args.bind {
        settings.agent_bind = bind;
    }
    if let Some(url) = args.llm_url {
        settings.llm.url = url;
    }
    if let Some(backend) = args.llm_backend {
        settings.llm.backend = backend;
    }
    if let Some(model) = args.model {
        settings.llm.model = model;
    }

    let registry = Arc::new(ServerRegistry::new());
    for url in &args.connect {
        registry.connect(url);
    }

    let agent = Agent::from_settings(&settings, registry)?;
    log::info!("Using model {} at {}", settings.llm.model, settings.llm.url);
    let app = agent_api::router(agent);

    server::serve(app, &settings.agent_bind, "agent API").await
}
