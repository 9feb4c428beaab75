use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use super::identity::resolve_prompt_id;
use crate::error::{ReportError, ReportResult};
use crate::model::{Bundle, Prompt, RawBundle, Recipe};

/// Dataset whose arrays are all present and whose prompts all carry an id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedDataset {
    bundles: Vec<Bundle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptLocation {
    pub bundle: String,
    pub recipe: String,
    pub index: usize,
}

/// Several prompts resolved to one id. Recoverable; the caller decides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateIdentity {
    pub id: String,
    pub locations: Vec<PromptLocation>,
}

#[derive(Debug, Clone, Default)]
pub struct Ingested {
    pub dataset: NormalizedDataset,
    pub duplicates: Vec<DuplicateIdentity>,
}

impl Ingested {
    pub fn has_duplicates(&self) -> bool {
        !self.duplicates.is_empty()
    }

    /// Rejects the dataset when any id is shared.
    pub fn into_strict(self) -> ReportResult<NormalizedDataset> {
        match self.duplicates.first() {
            Some(duplicate) => Err(ReportError::DuplicateIdentity {
                id: duplicate.id.clone(),
                count: duplicate.locations.len(),
            }),
            None => Ok(self.dataset),
        }
    }
}

pub fn ingest(raw: Vec<RawBundle>) -> ReportResult<Ingested> {
    let mut bundles = Vec::with_capacity(raw.len());
    let mut seen: BTreeMap<String, Vec<PromptLocation>> = BTreeMap::new();

    for (bundle_index, raw_bundle) in raw.into_iter().enumerate() {
        let raw_recipes = raw_bundle.recipes.ok_or_else(|| ReportError::DatasetShape {
            path: format!("bundles[{bundle_index}].recipes"),
        })?;

        let mut recipes = Vec::with_capacity(raw_recipes.len());
        for (recipe_index, raw_recipe) in raw_recipes.into_iter().enumerate() {
            let raw_prompts = raw_recipe.prompts.ok_or_else(|| ReportError::DatasetShape {
                path: format!("bundles[{bundle_index}].recipes[{recipe_index}].prompts"),
            })?;

            let mut prompts = Vec::with_capacity(raw_prompts.len());
            for (prompt_index, raw_prompt) in raw_prompts.into_iter().enumerate() {
                let id = resolve_prompt_id(
                    raw_prompt.id.as_deref(),
                    &raw_bundle.name,
                    &raw_recipe.name,
                    prompt_index,
                    &raw_prompt.prompt_message,
                );

                seen.entry(id.clone()).or_default().push(PromptLocation {
                    bundle: raw_bundle.name.clone(),
                    recipe: raw_recipe.name.clone(),
                    index: prompt_index,
                });

                prompts.push(Prompt {
                    id,
                    prompt_message: raw_prompt.prompt_message,
                    target: raw_prompt.target,
                    response: raw_prompt.response,
                    score: raw_prompt.score,
                    notes: raw_prompt.notes,
                });
            }

            recipes.push(Recipe {
                name: raw_recipe.name,
                percentage: raw_recipe.percentage,
                ci_minimum_band: raw_recipe.ci_minimum_band,
                ci_maximum_band: raw_recipe.ci_maximum_band,
                prompts,
            });
        }

        bundles.push(Bundle {
            name: raw_bundle.name,
            percentage: raw_bundle.percentage,
            recipes,
        });
    }

    let duplicates: Vec<DuplicateIdentity> = seen
        .into_iter()
        .filter(|(_, locations)| locations.len() > 1)
        .map(|(id, locations)| DuplicateIdentity { id, locations })
        .collect();

    for duplicate in &duplicates {
        warn!(
            id = %duplicate.id,
            count = duplicate.locations.len(),
            "duplicate prompt identity"
        );
    }

    let dataset = NormalizedDataset { bundles };
    debug!(
        bundles = dataset.bundles.len(),
        prompts = dataset.prompt_count(),
        duplicates = duplicates.len(),
        "ingested dataset"
    );

    Ok(Ingested {
        dataset,
        duplicates,
    })
}

impl NormalizedDataset {
    pub fn bundles(&self) -> &[Bundle] {
        &self.bundles
    }

    pub(crate) fn bundles_mut(&mut self) -> &mut [Bundle] {
        &mut self.bundles
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    pub fn prompts(&self) -> impl Iterator<Item = &Prompt> {
        self.bundles
            .iter()
            .flat_map(|bundle| bundle.recipes.iter())
            .flat_map(|recipe| recipe.prompts.iter())
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts().count()
    }

    /// Fails unless exactly one prompt carries `prompt_id`.
    pub fn require_single_prompt(&self, prompt_id: &str) -> ReportResult<()> {
        match self.prompts().filter(|prompt| prompt.id == prompt_id).count() {
            0 => Err(ReportError::NotFound {
                prompt_id: prompt_id.to_string(),
            }),
            1 => Ok(()),
            count => Err(ReportError::AmbiguousMatch {
                prompt_id: prompt_id.to_string(),
                count,
            }),
        }
    }

    pub fn find_prompt(&self, prompt_id: &str) -> Option<&Prompt> {
        self.prompts().find(|prompt| prompt.id == prompt_id)
    }

    pub fn prompt_ids(&self) -> HashSet<&str> {
        self.prompts().map(|prompt| prompt.id.as_str()).collect()
    }

    /// Distinct bundle names in first-seen order.
    pub fn bundle_names(&self) -> Vec<&str> {
        dedup_in_order(self.bundles.iter().map(|bundle| bundle.name.as_str()))
    }

    /// Distinct recipe names across all bundles in first-seen order.
    pub fn recipe_names(&self) -> Vec<&str> {
        dedup_in_order(
            self.bundles
                .iter()
                .flat_map(|bundle| bundle.recipes.iter())
                .map(|recipe| recipe.name.as_str()),
        )
    }
}

fn dedup_in_order<'a>(names: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    names.filter(|name| seen.insert(*name)).collect()
}
