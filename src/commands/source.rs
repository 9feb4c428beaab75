use std::time::Duration;

use anyhow::{Context, Result};
use tokio::runtime::Runtime;
use tracing::info;

use crate::cli::SourceArgs;
use benchreport::api::HttpBackend;
use benchreport::model::RawBundle;
use benchreport::report::ReportSession;
use benchreport::util::read_json;

pub(crate) fn runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

pub(crate) fn http_backend(api_url: &str, timeout_ms: u64) -> Result<HttpBackend> {
    HttpBackend::new(api_url, Duration::from_millis(timeout_ms))
        .with_context(|| format!("failed to configure backend for {api_url}"))
}

/// Loads the dataset named by `source` and applies its verdict overrides.
pub(crate) fn load_session(source: &SourceArgs) -> Result<ReportSession> {
    let mut session = match &source.input {
        Some(path) => {
            let raw: Vec<RawBundle> = read_json(path)?;
            ReportSession::from_raw(raw)
                .with_context(|| format!("failed to ingest {}", path.display()))?
        }
        None => {
            let backend = http_backend(&source.api_url, source.timeout_ms)?;
            let mut session = ReportSession::new();
            runtime()?
                .block_on(session.refresh(&backend))
                .with_context(|| format!("failed to load report from {}", source.api_url))?;
            session
        }
    };

    for (prompt_id, verdict) in &source.verdicts {
        session
            .record_verdict(prompt_id, Some(*verdict))
            .with_context(|| format!("cannot apply --verdict {prompt_id}={}", verdict.as_str()))?;
    }

    info!(
        bundles = session.dataset().bundles().len(),
        prompts = session.dataset().prompt_count(),
        verdicts = session.verdicts().len(),
        "report ready"
    );
    Ok(session)
}
