mod aggregate;
mod config;
mod extract;
mod merge;
mod pipeline;
mod series;
mod table;
mod tokenizer;

use clap::Parser;
use config::PartlogConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Extract edge-cut and timing metrics from graph partitioner logs, join
/// them across tools, and write normalized records for plotting.
#[derive(Parser, Debug)]
#[command(name = "partlog", version, about)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "partlog.toml")]
    config: PathBuf,

    /// Graph of interest (repeatable, overrides config)
    #[arg(short, long = "graph", value_name = "GRAPH")]
    graphs: Vec<String>,

    /// Baseline tool for speedups (overrides config)
    #[arg(short, long)]
    baseline: Option<String>,

    /// Report output path (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Validate config and print resolved settings, don't run
    #[arg(long)]
    dry_run: bool,

    /// Extra logging (per-log extraction counts)
    #[arg(short, long)]
    verbose: bool,

    /// Only warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut PartlogConfig) {
        if !self.graphs.is_empty() {
            config.pipeline.graphs = self.graphs.clone();
        }
        if let Some(baseline) = &self.baseline {
            config.pipeline.baseline = baseline.clone();
        }
        if let Some(output) = &self.output {
            config.pipeline.output = output.clone();
        }
    }

    fn default_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.default_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    tracing::debug!(?cli, "parsed CLI arguments");

    let mut config = match PartlogConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(path = %cli.config.display(), error = %e, "failed to load config");
            std::process::exit(2);
        }
    };
    cli.apply_overrides(&mut config);

    if cli.dry_run {
        println!("{config:#?}");
        return;
    }

    let report = match pipeline::run(&config) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = %e, "pipeline failed");
            std::process::exit(1);
        }
    };

    if let Err(e) = pipeline::write_report(&report, &config.pipeline.output) {
        tracing::error!(error = %e, "failed to write report");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_replace_config_values() {
        let cli = Cli::parse_from([
            "partlog",
            "--graph",
            "wb-edu",
            "-g",
            "cage15",
            "--baseline",
            "jet",
            "-o",
            "out.json",
        ]);
        let mut config = PartlogConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.pipeline.graphs, vec!["wb-edu", "cage15"]);
        assert_eq!(config.pipeline.baseline, "jet");
        assert_eq!(config.pipeline.output, PathBuf::from("out.json"));
    }

    #[test]
    fn no_flags_keep_config_values() {
        let cli = Cli::parse_from(["partlog"]);
        let mut config = PartlogConfig::default();
        cli.apply_overrides(&mut config);
        assert!(config.pipeline.graphs.is_empty());
        assert_eq!(config.pipeline.baseline, "hunyuan");
        assert_eq!(cli.default_level(), "info");
    }
}
