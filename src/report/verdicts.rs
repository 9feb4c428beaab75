use std::collections::{HashMap, HashSet};

use crate::model::{Prompt, Score, Verdict};

/// Reviewer overrides keyed by prompt id. Absence means "no override".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerdictMap {
    entries: HashMap<String, Verdict>,
}

impl VerdictMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, prompt_id: &str) -> Option<Verdict> {
        self.entries.get(prompt_id).copied()
    }

    /// Sets or clears the vote for `prompt_id`. Repeating a call is a no-op.
    pub fn record(&mut self, prompt_id: &str, vote: Option<Verdict>) {
        match vote {
            Some(verdict) => {
                self.entries.insert(prompt_id.to_string(), verdict);
            }
            None => {
                self.entries.remove(prompt_id);
            }
        }
    }

    /// Voting-button semantics: pressing the active vote clears it,
    /// pressing the other one switches to it.
    pub fn next_vote(&self, prompt_id: &str, pressed: Verdict) -> Option<Verdict> {
        if self.get(prompt_id) == Some(pressed) {
            None
        } else {
            Some(pressed)
        }
    }

    /// Records `next_vote` and returns the vote now in effect.
    pub fn toggle(&mut self, prompt_id: &str, pressed: Verdict) -> Option<Verdict> {
        let next = self.next_vote(prompt_id, pressed);
        self.record(prompt_id, next);
        next
    }

    pub fn is_disputed(&self, prompt_id: &str) -> bool {
        self.get(prompt_id) == Some(Verdict::Down)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drops overrides whose prompt no longer exists. Returns how many went.
    pub fn retain_known(&mut self, known: &HashSet<&str>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|id, _| known.contains(id.as_str()));
        before - self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Verdict)> {
        self.entries.iter().map(|(id, verdict)| (id.as_str(), *verdict))
    }
}

/// The single adjustment rule: a `down` verdict flips the judge's score.
pub fn effective_score(prompt: &Prompt, verdicts: &VerdictMap) -> Score {
    if verdicts.is_disputed(&prompt.id) {
        prompt.score.flipped()
    } else {
        prompt.score
    }
}
