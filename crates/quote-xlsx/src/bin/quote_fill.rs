use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use quote_xlsx::{fill_quote, fill_schedule, QuotePayload, ScheduleEntry, TemplateLayout, TemplatePackage};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(about = "Fill a laboratory quote or schedule template with data from a JSON payload.")]
struct Args {
    /// Template workbook (.xlsx).
    #[arg(long)]
    template: PathBuf,

    /// JSON payload: a quote object, or an array of entries with `--schedule`.
    #[arg(long)]
    payload: PathBuf,

    /// Where to write the filled workbook.
    #[arg(long, short)]
    output: PathBuf,

    /// JSON layout overriding the built-in preset.
    #[arg(long)]
    layout: Option<PathBuf>,

    /// Fill the schedule list instead of a quote.
    #[arg(long)]
    schedule: bool,

    /// Log each structural step (overridden by `RUST_LOG`).
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let template = TemplatePackage::open(&args.template)
        .with_context(|| format!("open template {}", args.template.display()))?;
    let layout = match &args.layout {
        Some(path) => TemplateLayout::from_json_file(path)
            .with_context(|| format!("load layout {}", path.display()))?,
        None if args.schedule => TemplateLayout::schedule(),
        None => TemplateLayout::laboratory_quote(),
    };
    let payload = std::fs::read_to_string(&args.payload)
        .with_context(|| format!("read payload {}", args.payload.display()))?;

    let filled = if args.schedule {
        let entries: Vec<ScheduleEntry> =
            serde_json::from_str(&payload).context("parse schedule entries")?;
        fill_schedule(&template, &layout, &entries)?
    } else {
        let quote = QuotePayload::from_json(&payload).context("parse quote payload")?;
        fill_quote(&template, &layout, &quote)?
    };

    std::fs::write(&args.output, &filled.bytes)
        .with_context(|| format!("write {}", args.output.display()))?;

    let summary = &filled.summary;
    match summary.totals {
        Some(totals) => println!(
            "{}: {} items, subtotal {:.2}, tax {:.2}, total {:.2}",
            args.output.display(),
            summary.items,
            totals.subtotal,
            totals.tax,
            totals.total
        ),
        None => println!("{}: {} items", args.output.display(), summary.items),
    }
    Ok(())
}
