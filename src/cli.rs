use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use benchreport::api::DEFAULT_API_URL;
use benchreport::model::Verdict;
use benchreport::report::{SortDirection, SortKey};

#[derive(Parser, Debug)]
#[command(
    name = "benchreport",
    version,
    about = "Aggregate, filter and review LLM benchmark reports"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Summary(SummaryArgs),
    Rows(RowsArgs),
    Chart(ChartArgs),
    Check(CheckArgs),
    UpdatePrompt(UpdatePromptArgs),
    Vote(VoteArgs),
}

/// Where the bundle dataset comes from.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Read bundles from a JSON file instead of the API.
    #[arg(long)]
    pub input: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_API_URL)]
    pub api_url: String,

    #[arg(long, default_value_t = 10_000)]
    pub timeout_ms: u64,

    /// Reviewer override applied before aggregation, as `<prompt-id>=<up|down>`.
    #[arg(long = "verdict", value_parser = parse_verdict_override)]
    pub verdicts: Vec<(String, Verdict)>,
}

#[derive(Args, Debug, Clone)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RowsArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[arg(long = "bundle")]
    pub bundles: Vec<String>,

    #[arg(long = "recipe")]
    pub recipes: Vec<String>,

    #[arg(long = "score", value_parser = clap::value_parser!(u8).range(0..=1))]
    pub scores: Vec<u8>,

    #[arg(long, default_value = "")]
    pub search: String,

    #[arg(long, value_enum)]
    pub sort: Option<SortKey>,

    #[arg(long, value_enum, default_value_t = SortDirection::Asc)]
    pub direction: SortDirection,

    #[arg(long, default_value_t = false)]
    pub grouped: bool,

    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ChartArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Fail when any prompt id is shared.
    #[arg(long, default_value_t = false)]
    pub strict: bool,
}

#[derive(Args, Debug, Clone)]
pub struct UpdatePromptArgs {
    #[arg(long, default_value = DEFAULT_API_URL)]
    pub api_url: String,

    #[arg(long, default_value_t = 10_000)]
    pub timeout_ms: u64,

    #[arg(long)]
    pub prompt_id: String,

    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub score: Option<u8>,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum VoteChoice {
    Up,
    Down,
    Clear,
}

impl VoteChoice {
    pub fn as_verdict(self) -> Option<Verdict> {
        match self {
            Self::Up => Some(Verdict::Up),
            Self::Down => Some(Verdict::Down),
            Self::Clear => None,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct VoteArgs {
    #[arg(long, default_value = DEFAULT_API_URL)]
    pub api_url: String,

    #[arg(long, default_value_t = 10_000)]
    pub timeout_ms: u64,

    #[arg(long)]
    pub prompt_id: String,

    #[arg(long, value_enum)]
    pub vote: VoteChoice,
}

fn parse_verdict_override(raw: &str) -> Result<(String, Verdict), String> {
    let (id, vote) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected <prompt-id>=<up|down>, got {raw}"))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(format!("missing prompt id in {raw}"));
    }

    let verdict = match vote.trim().to_ascii_lowercase().as_str() {
        "up" => Verdict::Up,
        "down" => Verdict::Down,
        other => return Err(format!("verdict must be up or down, got {other}")),
    };
    Ok((id.to_string(), verdict))
}
