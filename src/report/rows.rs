use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use clap::ValueEnum;
use serde::Serialize;

use super::ingest::NormalizedDataset;
use super::verdicts::VerdictMap;
use crate::model::{Row, Score};

/// Depth-first bundle → recipe → prompt walk in input order.
/// The verdict column is left empty; see `annotate_verdicts`.
pub fn flatten(dataset: &NormalizedDataset) -> Vec<Row> {
    let mut rows = Vec::with_capacity(dataset.prompt_count());
    for bundle in dataset.bundles() {
        for recipe in &bundle.recipes {
            for prompt in &recipe.prompts {
                rows.push(Row {
                    id: prompt.id.clone(),
                    bundle: bundle.name.clone(),
                    recipe: recipe.name.clone(),
                    prompt_message: prompt.prompt_message.clone(),
                    target: prompt.target.clone(),
                    response: prompt.response.clone(),
                    score: prompt.score,
                    notes: prompt.notes.clone(),
                    verdict: None,
                });
            }
        }
    }
    rows
}

pub fn annotate_verdicts(rows: &mut [Row], verdicts: &VerdictMap) {
    for row in rows {
        row.verdict = verdicts.get(&row.id);
    }
}

/// Row filter. An empty set places no restriction on its category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub bundles: BTreeSet<String>,
    pub recipes: BTreeSet<String>,
    pub scores: BTreeSet<Score>,
    pub search_text: String,
}

impl FilterCriteria {
    pub fn is_unrestricted(&self) -> bool {
        self.bundles.is_empty()
            && self.recipes.is_empty()
            && self.scores.is_empty()
            && self.search_text.is_empty()
    }

    pub fn matches(&self, row: &Row) -> bool {
        let matches_bundle = self.bundles.is_empty() || self.bundles.contains(&row.bundle);
        let matches_recipe = self.recipes.is_empty() || self.recipes.contains(&row.recipe);
        let matches_score = self.scores.is_empty() || self.scores.contains(&row.score);
        matches_bundle && matches_recipe && matches_score && self.matches_search(row)
    }

    fn matches_search(&self, row: &Row) -> bool {
        if self.search_text.is_empty() {
            return true;
        }
        let needle = self.search_text.to_lowercase();
        [
            Some(row.prompt_message.as_str()),
            Some(row.target.as_str()),
            Some(row.response.as_str()),
            row.notes.as_deref(),
            Some(row.bundle.as_str()),
            Some(row.recipe.as_str()),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Keeps the rows matching every category of `criteria`.
///
/// Only flattened rows can be filtered; the nested dataset is not accepted:
///
/// ```compile_fail
/// use benchreport::report::{FilterCriteria, filter, ingest};
///
/// let dataset = ingest(Vec::new()).unwrap().dataset;
/// let _ = filter(&dataset, &FilterCriteria::default());
/// ```
pub fn filter(rows: &[Row], criteria: &FilterCriteria) -> Vec<Row> {
    if criteria.is_unrestricted() {
        return rows.to_vec();
    }
    rows.iter()
        .filter(|row| criteria.matches(row))
        .cloned()
        .collect()
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Bundle,
    Recipe,
    PromptMessage,
    Target,
    Response,
    Score,
    Notes,
    Verdict,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Header-click behaviour: same key flips direction, a new key starts ascending.
    pub fn toggle(current: Option<SortSpec>, key: SortKey) -> SortSpec {
        match current {
            Some(spec) if spec.key == key => SortSpec::new(key, spec.direction.reversed()),
            _ => SortSpec::new(key, SortDirection::Asc),
        }
    }
}

fn text_field(row: &Row, key: SortKey) -> &str {
    match key {
        SortKey::Bundle => &row.bundle,
        SortKey::Recipe => &row.recipe,
        SortKey::PromptMessage => &row.prompt_message,
        SortKey::Target => &row.target,
        SortKey::Response => &row.response,
        SortKey::Notes => row.notes.as_deref().unwrap_or(""),
        SortKey::Verdict => row.verdict.map(|verdict| verdict.as_str()).unwrap_or(""),
        SortKey::Score => "",
    }
}

fn compare_rows(left: &Row, right: &Row, key: SortKey) -> Ordering {
    match key {
        SortKey::Score => left.score.as_u8().cmp(&right.score.as_u8()),
        _ => text_field(left, key).cmp(text_field(right, key)),
    }
}

/// Single-key sort. `score` compares numerically; text compares byte-wise,
/// case-sensitive; missing notes and verdicts sort as "".
///
/// Uses `slice::sort_by`, which is stable, so rows that tie keep their
/// input order for both directions. Descending is the reversed comparator,
/// not a reversed result.
pub fn sort(mut rows: Vec<Row>, key: SortKey, direction: SortDirection) -> Vec<Row> {
    rows.sort_by(|left, right| {
        let ordering = compare_rows(left, right, key);
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeGroup {
    pub recipe: String,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleGroup {
    pub bundle: String,
    pub recipes: Vec<RecipeGroup>,
}

/// Regroups rows into bundle → recipe sections for the list view.
///
/// Groups appear in the order their first row appears; rows keep their
/// relative order inside a group, so a sorted input yields sorted groups.
/// A group is only opened by a row, so none is empty.
pub fn group_rows(rows: &[Row]) -> Vec<BundleGroup> {
    let mut groups: Vec<BundleGroup> = Vec::new();
    let mut bundle_index: HashMap<&str, usize> = HashMap::new();
    let mut recipe_index: HashMap<(&str, &str), usize> = HashMap::new();

    for row in rows {
        let bundle_slot = *bundle_index.entry(row.bundle.as_str()).or_insert_with(|| {
            groups.push(BundleGroup {
                bundle: row.bundle.clone(),
                recipes: Vec::new(),
            });
            groups.len() - 1
        });
        let bundle = &mut groups[bundle_slot];

        let recipe_slot = *recipe_index
            .entry((row.bundle.as_str(), row.recipe.as_str()))
            .or_insert_with(|| {
                bundle.recipes.push(RecipeGroup {
                    recipe: row.recipe.clone(),
                    rows: Vec::new(),
                });
                bundle.recipes.len() - 1
            });
        bundle.recipes[recipe_slot].rows.push(row.clone());
    }
    groups
}
