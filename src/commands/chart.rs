use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use super::source::load_session;
use crate::cli::ChartArgs;
use benchreport::report::ChartSeries;
use benchreport::util::write_json_pretty;

pub fn run(args: ChartArgs) -> Result<()> {
    let session = load_session(&args.source)?;
    let series = session.chart();

    if let Some(path) = &args.output {
        write_json_pretty(path, &series)?;
        info!(path = %path.display(), "wrote chart series");
    }

    if args.json {
        let mut output = io::BufWriter::new(io::stdout().lock());
        serde_json::to_writer_pretty(&mut output, &series)
            .context("failed to serialize chart json output")?;
        writeln!(output)?;
        output.flush()?;
        return Ok(());
    }

    write_text_chart(&series)
}

fn write_text_chart(series: &ChartSeries) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    writeln!(output, "Bundles:")?;
    for bar in &series.bundles {
        writeln!(
            output,
            "\t{:>5.1}%\t{}\t{}",
            bar.percentage,
            render_bar(bar.percentage),
            bar.name
        )?;
    }

    writeln!(output, "Recipes:")?;
    for bar in &series.recipes {
        let band = match (bar.ci_minimum_band, bar.ci_maximum_band) {
            (Some(min), Some(max)) => format!("ci [{min:.1}, {max:.1}]"),
            _ => "ci n/a".to_string(),
        };
        writeln!(
            output,
            "\t{:>5.1}%\t{}\t{} / {}\tprompts={}\t{}",
            bar.percentage,
            render_bar(bar.percentage),
            bar.bundle,
            bar.name,
            bar.prompt_count,
            band
        )?;
    }

    output.flush()?;
    Ok(())
}

fn render_bar(percentage: f64) -> String {
    let filled = (percentage.clamp(0.0, 100.0) / 5.0).round() as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(20 - filled))
}
