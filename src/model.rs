use std::fmt;

use serde::{Deserialize, Serialize};

/// Binary pass/fail outcome assigned by the automated judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Score {
    Fail,
    Pass,
}

impl Score {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Fail => 0,
            Self::Pass => 1,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Self::Fail => Self::Pass,
            Self::Pass => Self::Fail,
        }
    }
}

impl TryFrom<u8> for Score {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Fail),
            1 => Ok(Self::Pass),
            other => Err(format!("score must be 0 or 1, got {other}")),
        }
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.as_u8()
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Reviewer agree/disagree vote on an automated score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Up,
    Down,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

// Wire shapes. Arrays stay optional so ingest can report a missing one
// instead of defaulting it.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBundle {
    pub name: String,
    #[serde(default, alias = "score", skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(default)]
    pub recipes: Option<Vec<RawRecipe>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecipe {
    #[serde(alias = "recipe_name")]
    pub name: String,
    #[serde(default, alias = "score", skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ci_minimum_band: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ci_maximum_band: Option<f64>,
    #[serde(default)]
    pub prompts: Option<Vec<RawPrompt>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPrompt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub prompt_message: String,
    pub target: String,
    pub response: String,
    pub score: Score,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// Normalized shapes produced by ingest.

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bundle {
    pub name: String,
    pub percentage: Option<f64>,
    pub recipes: Vec<Recipe>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipe {
    pub name: String,
    pub percentage: Option<f64>,
    pub ci_minimum_band: Option<f64>,
    pub ci_maximum_band: Option<f64>,
    pub prompts: Vec<Prompt>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prompt {
    pub id: String,
    pub prompt_message: String,
    pub target: String,
    pub response: String,
    pub score: Score,
    pub notes: Option<String>,
}

/// One flattened table row. Recomputed on every view pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub id: String,
    pub bundle: String,
    pub recipe: String,
    pub prompt_message: String,
    pub target: String,
    pub response: String,
    pub score: Score,
    pub notes: Option<String>,
    pub verdict: Option<Verdict>,
}

impl Row {
    pub fn effective_score(&self) -> Score {
        match self.verdict {
            Some(Verdict::Down) => self.score.flipped(),
            _ => self.score,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdatePromptRequest {
    pub prompt_id: String,
    pub score: Score,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoteRequest {
    pub prompt_id: String,
    pub vote: Option<Verdict>,
}

#[cfg(test)]
mod tests {
    use super::{RawBundle, Score, Verdict};

    #[test]
    fn score_rejects_values_outside_binary_range() {
        let error = serde_json::from_str::<Score>("2").expect_err("2 is not a valid score");
        assert!(
            error.to_string().contains("score must be 0 or 1"),
            "unexpected error: {error}"
        );
        assert_eq!(serde_json::from_str::<Score>("1").expect("1 parses"), Score::Pass);
    }

    #[test]
    fn raw_bundle_accepts_backend_renamed_fields() {
        let raw = r#"
        {
          "name": "Safety",
          "score": 75.0,
          "recipes": [
            {
              "recipe_name": "Toxicity",
              "score": 75.0,
              "prompts": [
                {"prompt_message": "hi", "target": "t", "response": "r", "score": 1}
              ]
            }
          ]
        }
        "#;

        let bundle: RawBundle = serde_json::from_str(raw).expect("renamed fields should parse");
        assert_eq!(bundle.percentage, Some(75.0));
        let recipes = bundle.recipes.expect("recipes present");
        assert_eq!(recipes[0].name, "Toxicity");
        assert_eq!(recipes[0].percentage, Some(75.0));
    }

    #[test]
    fn raw_bundle_keeps_missing_recipes_as_none() {
        let bundle: RawBundle =
            serde_json::from_str(r#"{"name": "Empty"}"#).expect("bundle without recipes parses");
        assert!(bundle.recipes.is_none());
    }

    #[test]
    fn verdict_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Verdict::Down).expect("verdict serializes"),
            "\"down\""
        );
    }
}
