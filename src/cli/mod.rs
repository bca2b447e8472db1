//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};

use prompt_autotest::config::file::DEFAULT_CONFIG_PATH;

/// Batched prompt template testing across LLM models
#[derive(Parser, Debug)]
#[command(name = "prompt-autotest")]
#[command(version)]
#[command(about = "Run a prompt template against synthesized test cases on several models")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Configuration file (defaults to the standard search locations)
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Test a prompt template
    Run(RunArgs),

    /// List the model registry
    Models(ModelsArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Prompt template with {{variable}} placeholders
    #[arg(short, long, conflicts_with = "prompt_file", required_unless_present = "prompt_file")]
    pub prompt: Option<String>,

    /// Read the prompt template from a file
    #[arg(long)]
    pub prompt_file: Option<String>,

    /// Declared variable as name or name:description (repeatable; inferred when absent)
    #[arg(long = "var")]
    pub vars: Vec<String>,

    /// Model id to test (repeatable; defaults to app.default_models)
    #[arg(short, long = "model")]
    pub models: Vec<String>,

    /// Generation temperature
    #[arg(short, long)]
    pub temperature: Option<f32>,

    /// Work items per batch
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Pause between batches in milliseconds
    #[arg(long)]
    pub batch_delay_ms: Option<u64>,

    /// Per-item deadline in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Score outputs with the judge model instead of the length heuristic
    #[arg(long)]
    pub accurate: bool,

    /// Judge model for accurate scoring
    #[arg(long)]
    pub judge_model: Option<String>,

    /// Model that authors the test cases
    #[arg(long)]
    pub synthesis_model: Option<String>,

    /// Run profile (quick, thorough, burst, or one from the config file)
    #[arg(long)]
    pub profile: Option<String>,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Export results to a .json or .csv file
    #[arg(short, long)]
    pub output: Option<String>,

    /// Use an in-memory echo client instead of the provider
    #[arg(long)]
    pub offline: bool,

    /// Disable coloured output
    #[arg(long)]
    pub no_color: bool,
}

/// Arguments for models command
#[derive(Parser, Debug)]
pub struct ModelsArgs {
    /// Show descriptions and tags
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for config management
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write an example configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        output: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    Show {
        /// Show environment overrides instead
        #[arg(long)]
        env: bool,

        /// Output format (yaml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Validate a configuration file
    Validate {
        /// File to validate (defaults to the first one found)
        file: Option<String>,
    },

    /// List run profiles
    Profiles {
        /// Show every field
        #[arg(short, long)]
        detailed: bool,
    },

    /// Print a configuration value
    Get {
        /// Dotted key, e.g. app.concurrency
        key: String,

        /// Configuration file
        #[arg(short, long)]
        file: Option<String>,
    },

    /// Set a configuration value
    Set {
        /// Dotted key, e.g. app.concurrency
        key: String,

        /// New value
        value: String,

        /// Configuration file
        #[arg(short, long)]
        file: Option<String>,
    },

    /// Describe supported environment variables
    Env,
}
