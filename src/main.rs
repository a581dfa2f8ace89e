use anyhow::{Context, Result};
use clap::Parser;
use gramspec::data::DataFrame;
use gramspec::parser::ast::FigureSpec;
use gramspec::{preprocessor, parser, resolve_figure, ResolveContext, ResolveOptions};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gramspec")]
#[command(about = "Resolve a grammar-of-graphics plot spec into a renderer-ready model", long_about = None)]
struct Args {
    /// Plot spec as a JSON file
    spec: PathBuf,

    /// CSV file replacing the plot-level data
    #[arg(long)]
    data: Option<PathBuf>,

    /// JSON file with resolution options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pretty-print the resolved model
    #[arg(long)]
    pretty: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let options = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str::<ResolveOptions>(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => ResolveOptions::default(),
    };
    let ctx = ResolveContext::new(options);

    let text = fs::read_to_string(&args.spec)
        .with_context(|| format!("Failed to read spec {}", args.spec.display()))?;
    let raw: serde_json::Value = serde_json::from_str(&text).context("Spec is not valid JSON")?;
    let mut figure = parser::normalize_figure(&preprocessor::canonicalize(&raw))
        .context("Failed to normalize spec")?;

    if let Some(path) = &args.data {
        let file = fs::File::open(path)
            .with_context(|| format!("Failed to open data {}", path.display()))?;
        let frame = DataFrame::from_csv(file).context("Failed to read CSV data")?;
        info!(rows = frame.row_count(), "loaded CSV data");
        match &mut figure {
            FigureSpec::Plot(plot) => plot.data = frame,
            FigureSpec::Subplots(_) => anyhow::bail!("--data applies to single plots only"),
        }
    }

    let resolved = resolve_figure(&figure, &ctx).context("Failed to resolve plot")?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&resolved)?
    } else {
        serde_json::to_string(&resolved)?
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", json).context("Failed to write to stdout")?;
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}
