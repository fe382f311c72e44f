use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Map search that understands both addresses and vibes.
#[derive(Debug, Parser)]
#[command(name = "wander", version, args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Arguments for `search`, which runs when no subcommand is given.
    #[command(flatten)]
    pub search: SearchArgs,
}

impl Cli {
    /// The command to run, defaulting to an interactive search.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Search(self.search))
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the token and resolve endpoints over HTTP.
    Serve(ServeArgs),
    /// Search interactively from the terminal.
    Search(SearchArgs),
}

impl Command {
    pub const fn common(&self) -> &Common {
        match self {
            Self::Serve(args) => &args.common,
            Self::Search(args) => &args.common,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct Common {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long)]
    pub debug: bool,
}

/// Credentials and model selection for the upstream services.
#[derive(Debug, Clone, Args)]
pub struct Secrets {
    #[arg(long, env = "MAPBOX_ACCESS_TOKEN", hide_env_values = true)]
    pub mapbox_token: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "WANDER_MODEL", default_value = wander_llm::openai::DEFAULT_MODEL)]
    pub model: String,

    /// OpenAI-compatible API base URL.
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub openai_base_url: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub common: Common,

    #[command(flatten)]
    pub secrets: Secrets,

    #[arg(long, env = "WANDER_BIND", default_value = "127.0.0.1:8888")]
    pub bind: SocketAddr,
}

#[derive(Debug, Clone, Args)]
pub struct SearchArgs {
    #[command(flatten)]
    pub common: Common,

    #[command(flatten)]
    pub secrets: Secrets,

    /// Resolve queries through a running `wander serve` instead of locally.
    #[arg(long, env = "WANDER_BACKEND")]
    pub backend: Option<String>,

    /// Where the last viewport is kept.
    #[arg(long, env = "WANDER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Do not emit analytics events.
    #[arg(long, env = "WANDER_NO_ANALYTICS")]
    pub no_analytics: bool,
}

impl SearchArgs {
    /// The configured data directory, or the platform default.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("wander")))
    }
}
