use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ueindex", author, version, about = "Static indexer for Unreal-style project trees")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "UEINDEX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a project and print a summary
    Scan(ScanArgs),
    /// Search declarations, callables, assets and plugins by name
    Search(SearchArgs),
    /// Show the parent chain of a declaration
    Hierarchy(HierarchyArgs),
    /// List files that reference a declaration
    Usages(UsagesArgs),
    /// Print summary statistics
    Stats(StatsArgs),
    /// Show or initialise the configuration
    Config(ConfigArgs),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum SearchType {
    All,
    Declaration,
    Callable,
    Asset,
    Plugin,
}

/// Options shared by every command that scans a project.
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Project root (the directory holding the .uproject file)
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    /// Extra exclude globs, relative to each scanned root
    #[arg(short, long)]
    pub exclude: Vec<String>,

    /// Scan on the current thread only
    #[arg(long)]
    pub sequential: bool,

    /// Skip source modules declared by plugins
    #[arg(long)]
    pub no_plugin_modules: bool,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Name, substring or regex
    pub query: String,

    #[command(flatten)]
    pub project: ProjectArgs,

    /// Entity family to search
    #[arg(short = 't', long = "type", value_enum, default_value_t = SearchType::All)]
    pub r#type: SearchType,

    /// Maximum results per family
    #[arg(short, long, default_value_t = 20)]
    pub limit: usize,

    /// Use fuzzy matching across all names
    #[arg(long)]
    pub fuzzy: bool,
}

#[derive(Args, Debug)]
pub struct HierarchyArgs {
    /// Declaration name
    pub name: String,

    #[command(flatten)]
    pub project: ProjectArgs,

    /// Also list direct children
    #[arg(long)]
    pub derived: bool,
}

#[derive(Args, Debug)]
pub struct UsagesArgs {
    /// Declaration name
    pub name: String,

    #[command(flatten)]
    pub project: ProjectArgs,

    /// Show each reference instead of distinct files
    #[arg(long)]
    pub edges: bool,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Write the effective configuration to the config path
    #[arg(long)]
    pub init: bool,
}
