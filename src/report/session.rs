use serde::Serialize;
use tracing::{debug, info, warn};

use super::chart::{ChartSeries, ReportMetrics, chart_series, report_metrics};
use super::edits::{PromptEdit, apply_edit, save_note};
use super::ingest::{DuplicateIdentity, NormalizedDataset, ingest};
use super::rows::{
    BundleGroup, FilterCriteria, SortSpec, annotate_verdicts, filter, flatten, group_rows, sort,
};
use super::verdicts::VerdictMap;
use crate::api::ReportBackend;
use crate::error::ReportResult;
use crate::model::{RawBundle, Row, UpdatePromptRequest, Verdict, VoteRequest};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready,
    /// Blocking error shown instead of the report. The previous dataset,
    /// if any, is kept.
    Failed(String),
}

/// Handed out by `begin_load`; only the newest ticket may apply its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied {
        prompts: usize,
        duplicates: usize,
        pruned_verdicts: usize,
    },
    /// A newer load was started before this one finished.
    Stale,
}

/// Everything one open report owns: data, reviewer verdicts and view state.
#[derive(Debug, Default)]
pub struct ReportSession {
    dataset: NormalizedDataset,
    duplicates: Vec<DuplicateIdentity>,
    verdicts: VerdictMap,
    pub filter: FilterCriteria,
    pub sort: Option<SortSpec>,
    generation: u64,
    state: LoadState,
}

impl ReportSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_raw(raw: Vec<RawBundle>) -> ReportResult<Self> {
        let mut session = Self::new();
        let ticket = session.begin_load();
        session.finish_load(ticket, Ok(raw))?;
        Ok(session)
    }

    pub fn dataset(&self) -> &NormalizedDataset {
        &self.dataset
    }

    pub fn duplicates(&self) -> &[DuplicateIdentity] {
        &self.duplicates
    }

    pub fn verdicts(&self) -> &VerdictMap {
        &self.verdicts
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.state = LoadState::Loading;
        LoadTicket {
            generation: self.generation,
        }
    }

    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: ReportResult<Vec<RawBundle>>,
    ) -> ReportResult<LoadOutcome> {
        if ticket.generation != self.generation {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding superseded load"
            );
            return Ok(LoadOutcome::Stale);
        }

        let ingested = match result.and_then(ingest) {
            Ok(ingested) => ingested,
            Err(err) => {
                warn!(error = %err, "report load failed");
                self.state = LoadState::Failed(err.to_string());
                return Err(err);
            }
        };

        let pruned_verdicts = self.verdicts.retain_known(&ingested.dataset.prompt_ids());
        if pruned_verdicts > 0 {
            info!(pruned = pruned_verdicts, "dropped verdicts for vanished prompts");
        }

        self.dataset = ingested.dataset;
        self.duplicates = ingested.duplicates;
        self.state = LoadState::Ready;

        let outcome = LoadOutcome::Applied {
            prompts: self.dataset.prompt_count(),
            duplicates: self.duplicates.len(),
            pruned_verdicts,
        };
        info!(
            generation = ticket.generation,
            prompts = self.dataset.prompt_count(),
            duplicates = self.duplicates.len(),
            "report loaded"
        );
        Ok(outcome)
    }

    pub async fn refresh<B: ReportBackend>(&mut self, backend: &B) -> ReportResult<LoadOutcome> {
        let ticket = self.begin_load();
        let result = backend.fetch_bundles().await;
        self.finish_load(ticket, result)
    }

    /// Records a reviewer verdict for the one prompt carrying `prompt_id`.
    /// Unknown or shared ids are refused and nothing is recorded.
    pub fn record_verdict(&mut self, prompt_id: &str, vote: Option<Verdict>) -> ReportResult<()> {
        self.dataset.require_single_prompt(prompt_id)?;
        self.verdicts.record(prompt_id, vote);
        Ok(())
    }

    /// Vote that results from pressing `pressed` on the prompt's buttons.
    pub fn next_vote(&self, prompt_id: &str, pressed: Verdict) -> Option<Verdict> {
        self.verdicts.next_vote(prompt_id, pressed)
    }

    /// Records the vote locally, then sends it. A rejected send restores
    /// the previous vote.
    pub async fn submit_vote<B: ReportBackend>(
        &mut self,
        backend: &B,
        prompt_id: &str,
        vote: Option<Verdict>,
    ) -> ReportResult<()> {
        self.dataset.require_single_prompt(prompt_id)?;

        let previous = self.verdicts.get(prompt_id);
        self.verdicts.record(prompt_id, vote);

        let request = VoteRequest {
            prompt_id: prompt_id.to_string(),
            vote,
        };
        if let Err(err) = backend.vote(&request).await {
            warn!(prompt_id, error = %err, "vote rejected; restoring previous vote");
            self.verdicts.record(prompt_id, previous);
            return Err(err);
        }
        Ok(())
    }

    pub fn save_note(&mut self, prompt_id: &str, note_text: &str) -> ReportResult<()> {
        save_note(&mut self.dataset, prompt_id, note_text)
    }

    /// Applies a score/notes edit locally and posts it. A rejected post
    /// reverts the local edit, the same policy votes follow.
    pub async fn commit_edit<B: ReportBackend>(
        &mut self,
        backend: &B,
        prompt_id: &str,
        edit: PromptEdit,
    ) -> ReportResult<()> {
        let previous = apply_edit(&mut self.dataset, prompt_id, &edit)?;

        let request = UpdatePromptRequest {
            prompt_id: prompt_id.to_string(),
            score: edit.score,
            notes: edit.notes.clone().unwrap_or_default(),
        };
        if let Err(err) = backend.update_prompt(&request).await {
            warn!(prompt_id, error = %err, "prompt update rejected; reverting edit");
            apply_edit(&mut self.dataset, prompt_id, &previous)?;
            return Err(err);
        }
        Ok(())
    }

    /// Flatten, attach verdicts, filter, then sort.
    pub fn rows(&self) -> Vec<Row> {
        let mut rows = flatten(&self.dataset);
        annotate_verdicts(&mut rows, &self.verdicts);
        let rows = filter(&rows, &self.filter);
        match self.sort {
            Some(spec) => sort(rows, spec.key, spec.direction),
            None => rows,
        }
    }

    pub fn grouped(&self) -> Vec<BundleGroup> {
        group_rows(&self.rows())
    }

    pub fn metrics(&self) -> ReportMetrics {
        report_metrics(&self.dataset, &self.verdicts)
    }

    pub fn chart(&self) -> ChartSeries {
        chart_series(&self.dataset, &self.verdicts)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::{LoadOutcome, LoadState, ReportSession};
    use crate::api::ReportBackend;
    use crate::error::{ReportError, ReportResult};
    use crate::model::{RawBundle, Score, UpdatePromptRequest, Verdict, VoteRequest};
    use crate::report::edits::PromptEdit;
    use crate::report::fixtures::{raw_bundle, raw_prompt, raw_recipe, sample_raw, scored_recipe};
    use crate::report::rows::{SortDirection, SortKey, SortSpec};

    #[derive(Default)]
    struct FakeBackend {
        bundles: Vec<RawBundle>,
        reject_writes: bool,
        updates: Mutex<Vec<UpdatePromptRequest>>,
        votes: Mutex<Vec<VoteRequest>>,
    }

    impl FakeBackend {
        fn serving(bundles: Vec<RawBundle>) -> Self {
            Self {
                bundles,
                ..Self::default()
            }
        }

        fn rejecting(bundles: Vec<RawBundle>) -> Self {
            Self {
                bundles,
                reject_writes: true,
                ..Self::default()
            }
        }

        fn rejection(&self, prompt_id: &str) -> ReportResult<()> {
            if self.reject_writes {
                return Err(ReportError::Save {
                    prompt_id: prompt_id.to_string(),
                    reason: "503".to_string(),
                });
            }
            Ok(())
        }
    }

    impl ReportBackend for FakeBackend {
        async fn fetch_bundles(&self) -> ReportResult<Vec<RawBundle>> {
            Ok(self.bundles.clone())
        }

        async fn update_prompt(&self, request: &UpdatePromptRequest) -> ReportResult<()> {
            self.updates
                .lock()
                .expect("updates lock")
                .push(request.clone());
            self.rejection(&request.prompt_id)
        }

        async fn vote(&self, request: &VoteRequest) -> ReportResult<()> {
            self.votes.lock().expect("votes lock").push(request.clone());
            self.rejection(&request.prompt_id)
        }
    }

    fn safety_raw() -> Vec<RawBundle> {
        vec![raw_bundle(
            "Safety",
            vec![scored_recipe("Toxicity", &[1, 1, 0, 1])],
        )]
    }

    #[tokio::test]
    async fn refresh_loads_and_marks_ready() {
        let backend = FakeBackend::serving(sample_raw());
        let mut session = ReportSession::new();
        assert_eq!(session.state(), &LoadState::Idle);

        let outcome = session.refresh(&backend).await.expect("refresh");
        assert_eq!(
            outcome,
            LoadOutcome::Applied {
                prompts: 5,
                duplicates: 0,
                pruned_verdicts: 0
            }
        );
        assert_eq!(session.state(), &LoadState::Ready);
        assert_eq!(session.rows().len(), 5);
    }

    #[test]
    fn superseded_load_is_discarded() {
        let mut session = ReportSession::new();
        let first = session.begin_load();
        let second = session.begin_load();

        let applied = session
            .finish_load(second, Ok(safety_raw()))
            .expect("newest load applies");
        assert!(matches!(applied, LoadOutcome::Applied { prompts: 4, .. }));

        let stale = session
            .finish_load(first, Ok(sample_raw()))
            .expect("stale load is not an error");
        assert_eq!(stale, LoadOutcome::Stale);
        assert_eq!(session.dataset().prompt_count(), 4);
    }

    #[test]
    fn failed_load_keeps_previous_dataset() {
        let mut session = ReportSession::from_raw(safety_raw()).expect("initial load");
        let ticket = session.begin_load();
        let error = session
            .finish_load(ticket, Err(ReportError::Fetch("connection refused".to_string())))
            .expect_err("fetch failure surfaces");

        assert!(matches!(error, ReportError::Fetch(_)));
        assert_eq!(
            session.state(),
            &LoadState::Failed("failed to fetch report data: connection refused".to_string())
        );
        assert_eq!(session.dataset().prompt_count(), 4);
    }

    #[test]
    fn reload_keeps_verdicts_for_stable_ids_only() {
        let mut session = ReportSession::from_raw(safety_raw()).expect("initial load");
        let kept = session.rows()[2].id.clone();
        session
            .record_verdict(&kept, Some(Verdict::Down))
            .expect("known prompt");
        session.verdicts.record("vanished", Some(Verdict::Up));

        let ticket = session.begin_load();
        let outcome = session
            .finish_load(ticket, Ok(safety_raw()))
            .expect("reload");
        assert!(matches!(
            outcome,
            LoadOutcome::Applied {
                pruned_verdicts: 1,
                ..
            }
        ));
        assert_eq!(session.verdicts().get(&kept), Some(Verdict::Down));
        assert_eq!(session.verdicts().len(), 1);
    }

    #[test]
    fn down_verdict_end_to_end() {
        let mut session = ReportSession::from_raw(safety_raw()).expect("load");
        let metrics = session.metrics();
        assert_eq!(metrics.overall_confidence, 75.0);
        assert_eq!(metrics.bundles[0].percentage, 75.0);
        assert_eq!(session.chart().recipes[0].percentage, 75.0);

        let third = session.rows()[2].id.clone();
        session
            .record_verdict(&third, Some(Verdict::Down))
            .expect("known prompt");
        assert_eq!(session.rows()[2].effective_score(), Score::Pass);
        assert_eq!(session.metrics().overall_confidence, 100.0);
        assert_eq!(session.chart().bundles[0].percentage, 100.0);
        assert_eq!(session.chart().recipes[0].percentage, 100.0);

        session.record_verdict(&third, None).expect("known prompt");
        assert_eq!(session.rows()[2].effective_score(), Score::Fail);
        assert_eq!(session.metrics().overall_confidence, 75.0);
    }

    #[tokio::test]
    async fn accepted_vote_sticks() {
        let backend = FakeBackend::serving(safety_raw());
        let mut session = ReportSession::new();
        session.refresh(&backend).await.expect("refresh");
        let id = session.rows()[0].id.clone();

        let vote = session.next_vote(&id, Verdict::Up);
        session
            .submit_vote(&backend, &id, vote)
            .await
            .expect("vote accepted");
        assert_eq!(session.verdicts().get(&id), Some(Verdict::Up));

        // Pressing the active vote again clears it.
        assert_eq!(session.next_vote(&id, Verdict::Up), None);
        let sent = backend.votes.lock().expect("votes lock");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].vote, Some(Verdict::Up));
    }

    #[tokio::test]
    async fn rejected_vote_rolls_back() {
        let backend = FakeBackend::rejecting(safety_raw());
        let mut session = ReportSession::new();
        session.refresh(&backend).await.expect("refresh");
        let id = session.rows()[1].id.clone();
        session
            .record_verdict(&id, Some(Verdict::Up))
            .expect("known prompt");

        let error = session
            .submit_vote(&backend, &id, Some(Verdict::Down))
            .await
            .expect_err("vote rejected");
        assert!(matches!(error, ReportError::Save { .. }));
        assert_eq!(session.verdicts().get(&id), Some(Verdict::Up));
    }

    #[tokio::test]
    async fn vote_on_unknown_prompt_is_not_sent() {
        let backend = FakeBackend::serving(safety_raw());
        let mut session = ReportSession::new();
        session.refresh(&backend).await.expect("refresh");

        let error = session
            .submit_vote(&backend, "nope", Some(Verdict::Down))
            .await
            .expect_err("unknown prompt");
        assert!(matches!(error, ReportError::NotFound { .. }));
        assert!(backend.votes.lock().expect("votes lock").is_empty());
    }

    #[tokio::test]
    async fn committed_edit_posts_score_and_notes() {
        let backend = FakeBackend::serving(safety_raw());
        let mut session = ReportSession::new();
        session.refresh(&backend).await.expect("refresh");
        let id = session.rows()[2].id.clone();

        session
            .commit_edit(
                &backend,
                &id,
                PromptEdit {
                    score: Score::Pass,
                    notes: Some("judge too strict".to_string()),
                },
            )
            .await
            .expect("edit accepted");

        let prompt = session.dataset().find_prompt(&id).expect("prompt");
        assert_eq!(prompt.score, Score::Pass);
        assert_eq!(prompt.notes.as_deref(), Some("judge too strict"));

        let sent = backend.updates.lock().expect("updates lock");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].prompt_id, id);
        assert_eq!(sent[0].notes, "judge too strict");
    }

    #[tokio::test]
    async fn rejected_edit_is_reverted() {
        let backend = FakeBackend::rejecting(safety_raw());
        let mut session = ReportSession::new();
        session.refresh(&backend).await.expect("refresh");
        let id = session.rows()[2].id.clone();

        let error = session
            .commit_edit(
                &backend,
                &id,
                PromptEdit {
                    score: Score::Pass,
                    notes: Some("lost".to_string()),
                },
            )
            .await
            .expect_err("edit rejected");
        assert!(matches!(error, ReportError::Save { .. }));

        let prompt = session.dataset().find_prompt(&id).expect("prompt");
        assert_eq!(prompt.score, Score::Fail);
        assert!(prompt.notes.is_none());
    }

    #[test]
    fn rows_apply_filter_then_sort() {
        let mut session = ReportSession::from_raw(sample_raw()).expect("load");
        session.filter.search_text = "user".to_string();
        session.sort = Some(SortSpec::new(SortKey::Score, SortDirection::Desc));

        let rows = session.rows();
        let messages: Vec<&str> = rows.iter().map(|row| row.prompt_message.as_str()).collect();
        assert_eq!(messages, vec!["praise the user", "insult the user"]);

        let groups = session.grouped();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].recipes[0].rows.len(), 2);
    }

    #[test]
    fn sorted_grouped_view_lists_each_bundle_once() {
        let mut session = ReportSession::from_raw(sample_raw()).expect("load");
        session.sort = Some(SortSpec::new(SortKey::Score, SortDirection::Asc));

        let groups = session.grouped();
        let layout: Vec<(&str, Vec<&str>)> = groups
            .iter()
            .map(|group| {
                (
                    group.bundle.as_str(),
                    group
                        .recipes
                        .iter()
                        .map(|recipe| recipe.recipe.as_str())
                        .collect(),
                )
            })
            .collect();
        assert_eq!(
            layout,
            vec![
                ("Safety", vec!["Toxicity", "Bias"]),
                ("Facts", vec!["Singapore"]),
            ]
        );
        assert_eq!(groups[1].recipes[0].rows[0].prompt_message, "national flower");
    }

    #[test]
    fn session_save_note_is_single_target() {
        let mut session = ReportSession::from_raw(sample_raw()).expect("load");
        let id = session.rows()[0].id.clone();
        session.save_note(&id, "checked").expect("note saved");
        assert_eq!(session.rows()[0].notes.as_deref(), Some("checked"));
        assert!(matches!(
            session.save_note("missing", "x"),
            Err(ReportError::NotFound { .. })
        ));
    }

    fn colliding_raw() -> Vec<RawBundle> {
        vec![raw_bundle(
            "B",
            vec![
                raw_recipe("R", vec![raw_prompt("same", 0)]),
                raw_recipe("R", vec![raw_prompt("same", 0)]),
            ],
        )]
    }

    #[test]
    fn verdict_on_shared_id_is_refused() {
        let mut session = ReportSession::from_raw(colliding_raw()).expect("lenient load");
        let shared = session.duplicates()[0].id.clone();

        let error = session
            .record_verdict(&shared, Some(Verdict::Down))
            .expect_err("shared id");
        assert_eq!(
            error,
            ReportError::AmbiguousMatch {
                prompt_id: shared.clone(),
                count: 2
            }
        );
        assert!(session.verdicts().is_empty());
        assert!(
            session
                .rows()
                .iter()
                .all(|row| row.effective_score() == Score::Fail)
        );
        assert_eq!(session.metrics().overall_confidence, 0.0);

        assert!(matches!(
            session.record_verdict("missing", Some(Verdict::Up)),
            Err(ReportError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn vote_on_shared_id_is_not_sent() {
        let backend = FakeBackend::serving(colliding_raw());
        let mut session = ReportSession::new();
        session.refresh(&backend).await.expect("refresh");
        let shared = session.duplicates()[0].id.clone();

        let error = session
            .submit_vote(&backend, &shared, Some(Verdict::Down))
            .await
            .expect_err("shared id");
        assert!(matches!(error, ReportError::AmbiguousMatch { count: 2, .. }));
        assert!(session.verdicts().is_empty());
        assert!(backend.votes.lock().expect("votes lock").is_empty());
    }
}
