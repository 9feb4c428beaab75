use std::collections::BTreeSet;
use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;

use super::source::load_session;
use crate::cli::RowsArgs;
use benchreport::model::{Row, Score};
use benchreport::report::{FilterCriteria, SortSpec, group_rows};

const PREVIEW_CHARS: usize = 48;

#[derive(Debug, Serialize)]
struct RowsResponse {
    total: usize,
    matched: usize,
    returned: usize,
    rows: Vec<Row>,
}

pub fn run(args: RowsArgs) -> Result<()> {
    let mut session = load_session(&args.source)?;
    session.filter = criteria_from_args(&args)?;
    session.sort = args
        .sort
        .map(|key| SortSpec::new(key, args.direction));

    let total = session.dataset().prompt_count();
    let mut rows = session.rows();
    let matched = rows.len();
    if let Some(limit) = args.limit {
        rows.truncate(limit);
    }

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        if args.grouped {
            serde_json::to_writer_pretty(&mut output, &group_rows(&rows))
                .context("failed to serialize grouped rows json output")?;
        } else {
            let response = RowsResponse {
                total,
                matched,
                returned: rows.len(),
                rows,
            };
            serde_json::to_writer_pretty(&mut output, &response)
                .context("failed to serialize rows json output")?;
        }
        writeln!(output)?;
        output.flush()?;
        return Ok(());
    }

    writeln!(output, "Rows: {matched} of {total} (showing {})", rows.len())?;
    if args.grouped {
        for bundle in group_rows(&rows) {
            writeln!(output, "{}", bundle.bundle)?;
            for recipe in bundle.recipes {
                writeln!(output, "  {} ({})", recipe.recipe, recipe.rows.len())?;
                for row in &recipe.rows {
                    writeln!(output, "    {}", format_row(row))?;
                }
            }
        }
    } else {
        for row in &rows {
            writeln!(output, "{}\t{}\t{}", row.bundle, row.recipe, format_row(row))?;
        }
    }

    output.flush()?;
    Ok(())
}

fn criteria_from_args(args: &RowsArgs) -> Result<FilterCriteria> {
    let scores: BTreeSet<Score> = args
        .scores
        .iter()
        .map(|value| Score::try_from(*value).map_err(anyhow::Error::msg))
        .collect::<Result<_>>()?;

    Ok(FilterCriteria {
        bundles: args.bundles.iter().cloned().collect(),
        recipes: args.recipes.iter().cloned().collect(),
        scores,
        search_text: args.search.clone(),
    })
}

fn format_row(row: &Row) -> String {
    let verdict = row.verdict.map(|verdict| verdict.as_str()).unwrap_or("-");
    format!(
        "score={} effective={} verdict={}\t{}\t{}",
        row.score,
        row.effective_score(),
        verdict,
        row.id,
        preview(&row.prompt_message)
    )
}

fn preview(text: &str) -> String {
    let condensed = text.split_whitespace().collect::<Vec<&str>>().join(" ");
    if condensed.chars().count() <= PREVIEW_CHARS {
        return condensed;
    }
    let cut: String = condensed.chars().take(PREVIEW_CHARS).collect();
    format!("{cut}...")
}
