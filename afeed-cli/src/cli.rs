use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[command(
    name = "afeed",
    version,
    about = "Fetch and list shared accounts from obfuscated feed bundles"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Obfuscated source bundle, overrides the configured one
    #[arg(long, global = true, env = "AFEED_BUNDLE", hide_env_values = true)]
    pub bundle: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

impl Args {
    pub fn output_format(&self) -> Option<OutputFormat> {
        match &self.command {
            Commands::Fetch(fetch) => fetch.output,
            Commands::Decode { output } => Some(*output),
            _ => None,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch accounts from every source and print the valid ones
    Fetch(FetchArgs),

    /// Decode the bundle and print the source locations
    Decode {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        output: OutputFormat,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show or reset the configuration
    Config {
        /// Print the current configuration
        #[arg(long)]
        show: bool,

        /// Reset the configuration file to defaults
        #[arg(long, conflicts_with = "show")]
        reset: bool,
    },
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct FetchArgs {
    /// Affiliate id for the promotion link
    #[arg(long)]
    pub aff: Option<String>,

    /// Page url whose `aff` query parameter is used when --aff is absent
    #[arg(long)]
    pub page_url: Option<String>,

    /// Output format, defaults to the configured one
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Per-attempt deadline in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Retries after the first attempt
    #[arg(long)]
    pub retries: Option<u32>,

    /// Keep results of healthy sources when others fail
    #[arg(long)]
    pub isolate_failures: bool,

    /// JSON file mapping region names to flag tags
    #[arg(long)]
    pub region_map: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Json,
    JsonCompact,
    Table,
}

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::JsonCompact)
    }
}
