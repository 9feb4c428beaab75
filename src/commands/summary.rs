use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use super::source::load_session;
use crate::cli::SummaryArgs;
use benchreport::report::{DuplicateIdentity, ReportMetrics};
use benchreport::util::{now_utc_string, write_json_pretty};

#[derive(Debug, Serialize)]
struct SummaryReport {
    generated_at: String,
    metrics: ReportMetrics,
    duplicates: Vec<DuplicateIdentity>,
}

pub fn run(args: SummaryArgs) -> Result<()> {
    let session = load_session(&args.source)?;
    let report = SummaryReport {
        generated_at: now_utc_string(),
        metrics: session.metrics(),
        duplicates: session.duplicates().to_vec(),
    };

    if let Some(path) = &args.output {
        write_json_pretty(path, &report)?;
        info!(path = %path.display(), "wrote summary");
    }

    if args.json {
        let mut output = io::BufWriter::new(io::stdout().lock());
        serde_json::to_writer_pretty(&mut output, &report)
            .context("failed to serialize summary json output")?;
        writeln!(output)?;
        output.flush()?;
        return Ok(());
    }

    write_text_summary(&report)
}

fn write_text_summary(report: &SummaryReport) -> Result<()> {
    let metrics = &report.metrics;
    let mut output = io::BufWriter::new(io::stdout().lock());

    writeln!(
        output,
        "Overall confidence: {:.1}% ({} of {} prompts passed, {} overridden)",
        metrics.overall_confidence, metrics.passed, metrics.prompt_count, metrics.overridden
    )?;
    writeln!(
        output,
        "Bundles: {} Recipes: {}",
        metrics.bundle_count, metrics.recipe_count
    )?;
    for bundle in &metrics.bundles {
        writeln!(output, "\t{:>5.1}%\t{}", bundle.percentage, bundle.name)?;
    }
    if !report.duplicates.is_empty() {
        writeln!(
            output,
            "Duplicate prompt ids: {} (see `benchreport check`)",
            report.duplicates.len()
        )?;
    }

    output.flush()?;
    Ok(())
}
