//! `qry`: run the quarry analyzer over a JavaScript file.
//!
//! Prints the module's dependencies (`require` calls, `import` declarations,
//! `export … from` re-exports, `import()` calls with their magic-comment
//! options, `typeof require` sites) as pretty JSON.

mod collect;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use quarry_core::analyzer::SourceTypeOption;
use quarry_core::{Analyzer, AnalyzerOptions};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::collect::Report;

#[derive(Parser, Debug)]
#[command(name = "qry", version, about = "Static dependency analysis for JavaScript modules")]
struct Cli {
    /// JavaScript file to analyze.
    file: PathBuf,

    /// JSON file with analyzer options (`sourceType`, `magicCommentPrefix`,
    /// `collectComments`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Grammar to parse with: auto, module or script.
    #[arg(long)]
    source_type: Option<SourceTypeOption>,

    /// Prefix of magic comments, e.g. `webpack` for `webpackChunkName`.
    #[arg(long = "magic-prefix")]
    magic_prefix: Option<String>,

    /// Log analyzer decisions to stderr.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct Output<'a> {
    file: &'a str,
    #[serde(flatten)]
    report: Report,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Options from `--config`, overridden by command-line flags.
fn load_options(cli: &Cli) -> Result<AnalyzerOptions> {
    let mut options = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => AnalyzerOptions::default(),
    };
    if let Some(source_type) = cli.source_type {
        options.source_type = source_type;
    }
    if let Some(prefix) = &cli.magic_prefix {
        options.magic_comment_prefix.clone_from(prefix);
    }
    debug!(?options, "analyzer options");
    Ok(options)
}

fn run(cli: &Cli) -> Result<String> {
    let options = load_options(cli)?;
    let source = fs::read_to_string(&cli.file)
        .with_context(|| format!("reading {}", cli.file.display()))?;

    let mut analyzer = Analyzer::new(options).context("invalid analyzer options")?;
    collect::register(analyzer.hooks_mut());
    let report = analyzer
        .parse(&source, Report::default())
        .with_context(|| format!("analyzing {}", cli.file.display()))?;
    info!(
        requires = report.requires.len(),
        imports = report.imports.len(),
        dynamic_imports = report.dynamic_imports.len(),
        "analysis finished"
    );

    let file = cli.file.to_string_lossy();
    let output = Output { file: &file, report };
    Ok(serde_json::to_string_pretty(&output)?)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let json = run(&cli)?;
    println!("{json}");
    Ok(())
}
