//! Framework-agnostic aggregation over bundle → recipe → prompt results.

mod chart;
mod edits;
mod identity;
mod ingest;
mod rows;
mod score;
mod session;
mod verdicts;

pub use chart::{BundleBar, ChartSeries, RecipeBar, ReportMetrics, chart_series, report_metrics};
pub use edits::{PromptEdit, apply_edit, save_note, set_score};
pub use identity::{ID_MESSAGE_PREFIX_CHARS, resolve_prompt_id, synthesize_prompt_id};
pub use ingest::{DuplicateIdentity, Ingested, NormalizedDataset, PromptLocation, ingest};
pub use rows::{
    BundleGroup, FilterCriteria, RecipeGroup, SortDirection, SortKey, SortSpec,
    annotate_verdicts, filter, flatten, group_rows, sort,
};
pub use score::{bundle_percentage, overall_confidence, recipe_percentage, round1};
pub use session::{LoadOutcome, LoadState, LoadTicket, ReportSession};
pub use verdicts::{VerdictMap, effective_score};
