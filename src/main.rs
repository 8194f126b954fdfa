//! tagmerge: merge struct tags from config documents into Go source.
//!
//! Reads one or more JSON/YAML/TOML documents mapping struct names to field
//! names to tag fragments, then rewrites the matching struct declarations in
//! a directory of Go files:
//!
//! ```text
//! tagmerge -d ./model -t tags.yaml -t overrides.json
//! ```
//!
//! Existing tag keys keep their position and take the new value; new keys
//! are appended. Only files whose tags actually change are written, and only
//! the tag literals inside them are touched.

mod annotation;
mod config;
mod emit;
mod error;
mod locate;
mod merge;
mod model;
mod parser;
mod quote;
mod run;

use anyhow::Result;
use clap::Parser;
use locate::TargetSelector;
use regex::Regex;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tagmerge", about = "Merge struct tags into Go struct declarations")]
struct Cli {
    /// Directory containing the Go code the tags are applied to
    #[arg(short = 'd', long = "dir", default_value = ".")]
    dir: PathBuf,

    /// JSON, YAML or TOML file with the tags to add (repeatable, later files win)
    #[arg(short = 't', long = "tags")]
    tags: Vec<PathBuf>,

    /// Only touch structs with this name (repeatable). Defaults to every struct named in the tags files.
    #[arg(long = "type", conflicts_with = "type_pattern")]
    types: Vec<String>,

    /// Only touch structs whose name matches this regex
    #[arg(long = "type-pattern")]
    type_pattern: Option<String>,

    /// Print the files that would change instead of writing them
    #[arg(short = 'n', long = "dry-run")]
    dry_run: bool,
}

impl Cli {
    fn selector(&self) -> Result<TargetSelector> {
        if let Some(pattern) = &self.type_pattern {
            let re = Regex::new(pattern)
                .map_err(|e| error::TagError::Config(format!("invalid --type-pattern: {e}")))?;
            return Ok(TargetSelector::Pattern(re));
        }
        if !self.types.is_empty() {
            return Ok(TargetSelector::Names(self.types.iter().cloned().collect()));
        }
        Ok(TargetSelector::UpdateSpec)
    }
}

fn execute(cli: Cli) -> Result<()> {
    let opts = run::RunOptions {
        selector: cli.selector()?,
        dir: cli.dir,
        tag_files: cli.tags,
        dry_run: cli.dry_run,
    };
    let summary = run::apply_tags(&opts)?;

    if opts.dry_run {
        for path in &summary.rewritten {
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tagmerge=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Errors go to stdout, like the rest of the tool's user-facing output.
            println!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
