use anyhow::{Result, bail};
use tracing::{info, warn};

use super::source::load_session;
use crate::cli::CheckArgs;

pub fn run(args: CheckArgs) -> Result<()> {
    let session = load_session(&args.source)?;
    let duplicates = session.duplicates();

    if duplicates.is_empty() {
        info!(
            prompts = session.dataset().prompt_count(),
            "all prompt ids are unique"
        );
        return Ok(());
    }

    for duplicate in duplicates {
        for location in &duplicate.locations {
            warn!(
                id = %duplicate.id,
                bundle = %location.bundle,
                recipe = %location.recipe,
                index = location.index,
                "shared prompt id"
            );
        }
    }

    if args.strict {
        bail!(
            "{} prompt ids are shared by more than one prompt",
            duplicates.len()
        );
    }
    Ok(())
}
