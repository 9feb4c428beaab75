use anyhow::{Context, Result, bail};
use tracing::info;

use super::source::{http_backend, runtime};
use crate::cli::{UpdatePromptArgs, VoteArgs};
use benchreport::api::ReportBackend;
use benchreport::model::{Score, VoteRequest};
use benchreport::report::{PromptEdit, ReportSession};

/// Loads the live report, applies the edit through the session (which
/// refuses unknown or ambiguous ids) and posts it.
pub fn run_update_prompt(args: UpdatePromptArgs) -> Result<()> {
    if args.score.is_none() && args.notes.is_none() {
        bail!("nothing to update: pass --score and/or --notes");
    }

    let backend = http_backend(&args.api_url, args.timeout_ms)?;
    let rt = runtime()?;
    let mut session = ReportSession::new();
    rt.block_on(session.refresh(&backend))
        .with_context(|| format!("failed to load report from {}", args.api_url))?;

    let current = session
        .dataset()
        .find_prompt(&args.prompt_id)
        .map(PromptEdit::from_prompt)
        .with_context(|| format!("prompt {} not found", args.prompt_id))?;

    let edit = PromptEdit {
        score: match args.score {
            Some(value) => Score::try_from(value).map_err(anyhow::Error::msg)?,
            None => current.score,
        },
        notes: args.notes.clone().or(current.notes),
    };

    rt.block_on(session.commit_edit(&backend, &args.prompt_id, edit))
        .with_context(|| format!("failed to update prompt {}", args.prompt_id))?;

    info!(prompt_id = %args.prompt_id, "prompt updated");
    Ok(())
}

pub fn run_vote(args: VoteArgs) -> Result<()> {
    let backend = http_backend(&args.api_url, args.timeout_ms)?;
    let request = VoteRequest {
        prompt_id: args.prompt_id.clone(),
        vote: args.vote.as_verdict(),
    };

    runtime()?
        .block_on(backend.vote(&request))
        .with_context(|| format!("failed to record vote for {}", args.prompt_id))?;

    info!(
        prompt_id = %args.prompt_id,
        vote = request.vote.map(|verdict| verdict.as_str()).unwrap_or("none"),
        "vote recorded"
    );
    Ok(())
}
