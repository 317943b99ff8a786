use anyhow::Result;
use tracing::info;

use super::StageRunner;
use crate::job::JobToken;
use crate::stage::keys;

/// Submit QC report generation once `hold` has finished.
pub async fn run_qc(runner: &StageRunner<'_>, hold: &JobToken) -> Result<JobToken> {
    let token = runner.run(keys::QC, hold).await?;
    info!(token = %token, "Quality control submitted");
    Ok(token)
}
