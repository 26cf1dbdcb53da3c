use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::QuorumConfig;
use quorum_core::{
    AnthropicBackend, BackendSet, CompareRequest, EnsembleRequest, GeminiBackend, GroqBackend,
    OpenAiBackend, Orchestrator, OrchestratorConfig, ProviderFamily, RequestContext, SerperSearch,
    SingleRequest,
};
use quorum_store::ChatDb;

#[derive(Parser)]
#[command(name = "quorum")]
#[command(version)]
#[command(about = "Route one question across many models")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Session id grouping turns into one conversation
    #[arg(short, long, global = true, default_value = "default")]
    session: String,

    /// Name recorded against your messages
    #[arg(short, long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the config directory and a default config
    Init,

    /// Show the resolved configuration
    Config,

    /// Ask one automatically routed model
    Ask {
        /// The message to send
        message: String,

        /// Pin a provider family (groq, gemini, openai, anthropic)
        /// instead of automatic routing
        #[arg(short, long)]
        provider: Option<String>,

        /// Request web-search grounding
        #[arg(short, long)]
        web: bool,

        /// Knowledge layers to include beyond "company"
        #[arg(short, long)]
        layer: Vec<String>,
    },

    /// Send the same prompt to two models side by side
    Compare {
        message: String,

        /// Pairing id, e.g. groq-gemini or openai-claude
        #[arg(short, long)]
        pair: Option<String>,

        #[arg(short, long)]
        web: bool,

        #[arg(short, long)]
        layer: Vec<String>,
    },

    /// Draft, critique, and synthesize a best answer
    Best {
        message: String,

        #[arg(short, long)]
        web: bool,

        #[arg(short, long)]
        layer: Vec<String>,

        /// Also print the draft and critique stages
        #[arg(short, long)]
        trail: bool,
    },

    /// Manage knowledge-base entries
    Knowledge {
        #[command(subcommand)]
        command: KnowledgeCommands,
    },
}

#[derive(Subcommand)]
enum KnowledgeCommands {
    /// Add an entry to a layer
    Add {
        layer: String,
        title: String,
        content: String,
    },

    /// List all entries
    List,

    /// Remove an entry by id
    Remove { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let context = RequestContext::new(cli.session.clone(), resolve_user(&cli.user));

    match cli.command {
        Commands::Init => cmd_init(),
        Commands::Config => cmd_config(&cli.config),
        Commands::Ask { message, provider, web, layer } => {
            cmd_ask(&cli.config, context.with_layers(layer), message, provider, web).await
        }
        Commands::Compare { message, pair, web, layer } => {
            cmd_compare(&cli.config, context.with_layers(layer), message, pair, web).await
        }
        Commands::Best { message, web, layer, trail } => {
            cmd_best(&cli.config, context.with_layers(layer), message, web, trail).await
        }
        Commands::Knowledge { command } => cmd_knowledge(&cli.config, command).await,
    }
}

fn resolve_user(flag: &Option<String>) -> String {
    flag.clone()
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| "user".to_string())
}

fn cmd_init() -> Result<()> {
    let dir = config::config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config dir: {}", dir.display()))?;

    let path = dir.join("config.toml");
    if path.exists() {
        println!("Config already exists at {}", path.display());
    } else {
        std::fs::write(&path, include_str!("../../../config/default.toml"))?;
        println!("Created default config at {}", path.display());
    }
    println!("Set your API keys in the config or export them as environment variables.");
    Ok(())
}

fn cmd_config(path: &Option<PathBuf>) -> Result<()> {
    let config = QuorumConfig::load(path)?;
    println!("{:#?}", config);
    Ok(())
}

fn build_orchestrator(config: &QuorumConfig) -> Result<Orchestrator> {
    let db_path = config.db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let db = Arc::new(ChatDb::new(&db_path)?);

    let backends = BackendSet::new()
        .register(Arc::new(GroqBackend::new(config.keys.groq.clone())))
        .register(Arc::new(GeminiBackend::new(config.keys.gemini.clone())))
        .register(Arc::new(OpenAiBackend::new(config.keys.openai.clone())))
        .register(Arc::new(AnthropicBackend::new(config.keys.anthropic.clone())));
    let searcher = Arc::new(SerperSearch::new(Some(config.keys.serper.clone())));

    Ok(
        Orchestrator::new(backends, db.clone(), db, searcher).with_config(OrchestratorConfig {
            role_text: config.assistant.role_text.clone(),
            history_limit: config.assistant.history_limit,
        }),
    )
}

async fn cmd_ask(
    config_path: &Option<PathBuf>,
    context: RequestContext,
    message: String,
    provider: Option<String>,
    web: bool,
) -> Result<()> {
    let config = QuorumConfig::load(config_path)?;
    let orchestrator = build_orchestrator(&config)?;

    // Unknown provider names fall through to automatic routing.
    let preferred = provider.as_deref().and_then(ProviderFamily::from_string);
    if provider.is_some() && preferred.is_none() {
        info!("unrecognized provider {:?}, routing automatically", provider);
    }

    let reply = orchestrator
        .handle_single(SingleRequest {
            context,
            message,
            preferred,
            want_web_search: web,
        })
        .await?;

    println!("{}", reply.text);
    println!(
        "\n[{} · {} tier{}]",
        reply.model_label,
        reply.tier,
        if reply.searched_web { " · searched web" } else { "" }
    );
    Ok(())
}

async fn cmd_compare(
    config_path: &Option<PathBuf>,
    context: RequestContext,
    message: String,
    pair: Option<String>,
    web: bool,
) -> Result<()> {
    let config = QuorumConfig::load(config_path)?;
    let orchestrator = build_orchestrator(&config)?;

    let reply = orchestrator
        .handle_compare(CompareRequest {
            context,
            message,
            pair,
            want_web_search: web,
        })
        .await?;

    println!("## {}\n\n{}\n", reply.a.label, reply.a.text);
    println!("---\n");
    println!("## {}\n\n{}", reply.b.label, reply.b.text);
    Ok(())
}

async fn cmd_best(
    config_path: &Option<PathBuf>,
    context: RequestContext,
    message: String,
    web: bool,
    trail: bool,
) -> Result<()> {
    let config = QuorumConfig::load(config_path)?;
    let orchestrator = build_orchestrator(&config)?;

    let reply = orchestrator
        .handle_ensemble(EnsembleRequest {
            context,
            message,
            want_web_search: web,
        })
        .await?;

    if trail {
        println!("## Draft ({})\n\n{}\n", reply.participants.drafter, reply.draft);
        println!("## Critique ({})\n\n{}\n", reply.participants.critic, reply.critique);
        println!("## Final ({})\n", reply.participants.synthesizer);
    }
    println!("{}", reply.final_text);
    if reply.searched_web {
        println!("\n[web verified]");
    }
    Ok(())
}

async fn cmd_knowledge(config_path: &Option<PathBuf>, command: KnowledgeCommands) -> Result<()> {
    let config = QuorumConfig::load(config_path)?;
    let db_path = config.db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = ChatDb::new(&db_path)?;

    match command {
        KnowledgeCommands::Add { layer, title, content } => {
            let id = db.add_knowledge(&layer, &title, &content).await?;
            println!("Added {id} to layer '{layer}'");
        }
        KnowledgeCommands::List => {
            let rows = db.all_knowledge().await?;
            if rows.is_empty() {
                println!("No knowledge entries yet. Add one with `quorum knowledge add`.");
            }
            for row in rows {
                println!("[{}] {} ({})", row.layer, row.title, row.id);
            }
        }
        KnowledgeCommands::Remove { id } => {
            if db.delete_knowledge(&id).await? {
                println!("Removed {id}");
            } else {
                println!("No entry with id {id}");
            }
        }
    }
    Ok(())
}
