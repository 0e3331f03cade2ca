mod cli;
mod commands;
mod config;

use crate::cli::{Commands, DocgraphCli};
use crate::config::FileConfig;
use anyhow::Result;
use logging::LogMode;

fn main() -> Result<()> {
    let cli = DocgraphCli::parse_args();

    match cli.command {
        Commands::Index {
            namespaces,
            graph,
            no_infer,
            threads,
            bundle_dir,
            config,
            bindings,
            verbose,
            log_file,
            stats,
        } => {
            let mode = if log_file {
                LogMode::File {
                    log_dir: logging::default_log_directory()?,
                }
            } else {
                LogMode::Cli
            };
            let _guards = logging::init(mode, verbose)?;

            let file_config = FileConfig::load(config.as_deref())?;
            let bundle_root = file_config.bundle_root(bundle_dir)?;
            let indexing_config = file_config.indexing_config(threads, no_infer, bindings);
            commands::index::run(&graph, bundle_root, &namespaces, &indexing_config, stats)
        }
        Commands::Clean {
            namespaces,
            bundle_dir,
            config,
        } => {
            let _guards = logging::init(LogMode::Cli, false)?;

            let file_config = FileConfig::load(config.as_deref())?;
            let bundle_root = file_config.bundle_root(bundle_dir)?;
            commands::clean::run(bundle_root, &namespaces)
        }
    }
}
