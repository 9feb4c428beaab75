use super::ingest::NormalizedDataset;
use crate::error::{ReportError, ReportResult};
use crate::model::{Prompt, Score};

/// Local edit of one prompt, mirroring the POST body the backend accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptEdit {
    pub score: Score,
    pub notes: Option<String>,
}

impl PromptEdit {
    pub fn from_prompt(prompt: &Prompt) -> Self {
        Self {
            score: prompt.score,
            notes: prompt.notes.clone(),
        }
    }
}

fn single_match<'a>(
    dataset: &'a mut NormalizedDataset,
    prompt_id: &str,
) -> ReportResult<&'a mut Prompt> {
    let mut matches: Vec<&mut Prompt> = dataset
        .bundles_mut()
        .iter_mut()
        .flat_map(|bundle| bundle.recipes.iter_mut())
        .flat_map(|recipe| recipe.prompts.iter_mut())
        .filter(|prompt| prompt.id == prompt_id)
        .collect();

    match matches.len() {
        0 => Err(ReportError::NotFound {
            prompt_id: prompt_id.to_string(),
        }),
        1 => Ok(matches.remove(0)),
        count => Err(ReportError::AmbiguousMatch {
            prompt_id: prompt_id.to_string(),
            count,
        }),
    }
}

/// Replaces the notes of the one prompt carrying `prompt_id`.
/// Writes nothing unless exactly one prompt matches.
pub fn save_note(
    dataset: &mut NormalizedDataset,
    prompt_id: &str,
    note_text: &str,
) -> ReportResult<()> {
    let prompt = single_match(dataset, prompt_id)?;
    prompt.notes = Some(note_text.to_string());
    Ok(())
}

pub fn set_score(
    dataset: &mut NormalizedDataset,
    prompt_id: &str,
    score: Score,
) -> ReportResult<()> {
    let prompt = single_match(dataset, prompt_id)?;
    prompt.score = score;
    Ok(())
}

/// Applies `edit` and returns what it replaced, for rollback.
pub fn apply_edit(
    dataset: &mut NormalizedDataset,
    prompt_id: &str,
    edit: &PromptEdit,
) -> ReportResult<PromptEdit> {
    let prompt = single_match(dataset, prompt_id)?;
    let previous = PromptEdit::from_prompt(prompt);
    prompt.score = edit.score;
    prompt.notes = edit.notes.clone();
    Ok(previous)
}
