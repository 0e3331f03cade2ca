use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "docgraph",
    version,
    about = "Documentation bundle indexer",
    long_about = "Crawls the public symbols of a namespace and writes one structured documentation artifact per symbol."
)]
pub struct DocgraphCli {
    #[command(subcommand)]
    pub command: Commands,
}

impl DocgraphCli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rebuild the documentation bundle of one or more namespaces
    Index {
        /// Root namespaces to index, in order
        #[arg(value_name = "NAMESPACE", required = true)]
        namespaces: Vec<String>,

        /// JSON namespace dump to load objects from
        #[arg(long, value_name = "FILE")]
        graph: PathBuf,

        /// Skip resolution inference for example tokens
        #[arg(long)]
        no_infer: bool,

        /// Number of worker threads (0 means auto-detect based on CPU cores)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Directory holding one bundle per namespace
        #[arg(long, value_name = "DIR")]
        bundle_dir: Option<PathBuf>,

        /// TOML configuration file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Name visible to every example snippet, e.g. np=numpy
        #[arg(long = "bind", value_name = "NAME=IDENTITY", value_parser = parse_binding)]
        bindings: Vec<(String, String)>,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,

        /// Write logs to ~/.docgraph/logs instead of stdout
        #[arg(long)]
        log_file: bool,

        /// Output statistics. Optionally specify a file path to save to.
        #[arg(long, value_name = "FILE", num_args = 0..=1, require_equals = true)]
        stats: Option<Option<PathBuf>>,
    },
    /// Remove every artifact of the given bundles
    Clean {
        #[arg(value_name = "NAMESPACE", required = true)]
        namespaces: Vec<String>,

        /// Directory holding one bundle per namespace
        #[arg(long, value_name = "DIR")]
        bundle_dir: Option<PathBuf>,

        /// TOML configuration file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

fn parse_binding(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((name, identity)) if !name.trim().is_empty() && !identity.trim().is_empty() => {
            Ok((name.trim().to_string(), identity.trim().to_string()))
        }
        _ => Err(format!("expected NAME=IDENTITY, got '{value}'")),
    }
}
