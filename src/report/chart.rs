use serde::Serialize;

use super::ingest::NormalizedDataset;
use super::score::{bundle_percentage, overall_confidence, recipe_percentage};
use super::verdicts::{VerdictMap, effective_score};
use crate::model::Score;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleBar {
    pub name: String,
    pub percentage: f64,
}

/// Recipe bar. The confidence band comes from the API and is only carried.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeBar {
    pub bundle: String,
    pub name: String,
    pub percentage: f64,
    pub prompt_count: usize,
    pub ci_minimum_band: Option<f64>,
    pub ci_maximum_band: Option<f64>,
}

impl RecipeBar {
    /// `(below, above)` distances from the bar to the band edges, when both
    /// edges are known.
    pub fn error_bar(&self) -> Option<(f64, f64)> {
        match (self.ci_minimum_band, self.ci_maximum_band) {
            (Some(min), Some(max)) => Some((self.percentage - min, max - self.percentage)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub bundles: Vec<BundleBar>,
    pub recipes: Vec<RecipeBar>,
}

pub fn chart_series(dataset: &NormalizedDataset, verdicts: &VerdictMap) -> ChartSeries {
    let bundles = dataset
        .bundles()
        .iter()
        .map(|bundle| BundleBar {
            name: bundle.name.clone(),
            percentage: bundle_percentage(bundle, verdicts),
        })
        .collect();

    let recipes = dataset
        .bundles()
        .iter()
        .flat_map(|bundle| {
            bundle.recipes.iter().map(|recipe| RecipeBar {
                bundle: bundle.name.clone(),
                name: recipe.name.clone(),
                percentage: recipe_percentage(recipe, verdicts),
                prompt_count: recipe.prompts.len(),
                ci_minimum_band: recipe.ci_minimum_band,
                ci_maximum_band: recipe.ci_maximum_band,
            })
        })
        .collect();

    ChartSeries { bundles, recipes }
}

/// Figures for the report's metrics header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetrics {
    pub bundle_count: usize,
    pub recipe_count: usize,
    pub prompt_count: usize,
    pub passed: usize,
    pub failed: usize,
    pub overridden: usize,
    pub overall_confidence: f64,
    pub bundles: Vec<BundleBar>,
}

pub fn report_metrics(dataset: &NormalizedDataset, verdicts: &VerdictMap) -> ReportMetrics {
    let mut passed = 0;
    let mut failed = 0;
    let mut overridden = 0;
    for prompt in dataset.prompts() {
        match effective_score(prompt, verdicts) {
            Score::Pass => passed += 1,
            Score::Fail => failed += 1,
        }
        if verdicts.is_disputed(&prompt.id) {
            overridden += 1;
        }
    }

    ReportMetrics {
        bundle_count: dataset.bundles().len(),
        recipe_count: dataset
            .bundles()
            .iter()
            .map(|bundle| bundle.recipes.len())
            .sum(),
        prompt_count: passed + failed,
        passed,
        failed,
        overridden,
        overall_confidence: overall_confidence(dataset, verdicts),
        bundles: chart_series(dataset, verdicts).bundles,
    }
}
