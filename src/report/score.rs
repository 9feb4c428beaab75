use super::ingest::NormalizedDataset;
use super::verdicts::{VerdictMap, effective_score};
use crate::model::{Bundle, Prompt, Recipe, Score};

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn pass_rate<'a>(prompts: impl Iterator<Item = &'a Prompt>, verdicts: &VerdictMap) -> f64 {
    let (passed, total) = prompts.fold((0_usize, 0_usize), |(passed, total), prompt| {
        let hit = usize::from(effective_score(prompt, verdicts) == Score::Pass);
        (passed + hit, total + 1)
    });
    if total == 0 {
        return 0.0;
    }
    round1(100.0 * passed as f64 / total as f64)
}

fn any_disputed<'a>(mut prompts: impl Iterator<Item = &'a Prompt>, verdicts: &VerdictMap) -> bool {
    prompts.any(|prompt| verdicts.is_disputed(&prompt.id))
}

/// Pass rate of a recipe, in percent with one decimal.
///
/// A percentage supplied by the API is returned untouched unless one of the
/// recipe's prompts carries a `down` verdict; an `up` verdict changes nothing
/// and so does not invalidate it.
pub fn recipe_percentage(recipe: &Recipe, verdicts: &VerdictMap) -> f64 {
    if let Some(supplied) = recipe.percentage {
        if !any_disputed(recipe.prompts.iter(), verdicts) {
            return supplied;
        }
    }
    pass_rate(recipe.prompts.iter(), verdicts)
}

/// Unweighted mean of the recipe percentages. A recipe with one prompt
/// counts as much as a recipe with a thousand; see `overall_confidence`
/// for the prompt-weighted figure.
pub fn bundle_percentage(bundle: &Bundle, verdicts: &VerdictMap) -> f64 {
    if let Some(supplied) = bundle.percentage {
        let prompts = bundle.recipes.iter().flat_map(|recipe| recipe.prompts.iter());
        if !any_disputed(prompts, verdicts) {
            return supplied;
        }
    }

    if bundle.recipes.is_empty() {
        return 0.0;
    }

    let sum: f64 = bundle
        .recipes
        .iter()
        .map(|recipe| recipe_percentage(recipe, verdicts))
        .sum();
    round1(sum / bundle.recipes.len() as f64)
}

/// Prompt-weighted pass rate across the whole dataset.
pub fn overall_confidence(dataset: &NormalizedDataset, verdicts: &VerdictMap) -> f64 {
    pass_rate(dataset.prompts(), verdicts)
}
