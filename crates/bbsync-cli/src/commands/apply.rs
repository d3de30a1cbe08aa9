use anyhow::Result;
use bbsync_reconciler::{DesiredState, ReconcileResult, RepositoryReconciler, ResourceState};
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use crate::output::{ReportRow, failures, print_report};

/// Observe each repository and create or update it as needed.
///
/// One pass: a failed repository is reported and the next one is tried.
pub async fn apply(
    reconciler: &RepositoryReconciler,
    repositories: &[&DesiredState],
    cancel: &CancellationToken,
) -> Result<()> {
    let mut rows = Vec::with_capacity(repositories.len());
    for desired in repositories {
        match converge(reconciler, desired, cancel).await {
            Ok(row) => rows.push(row),
            Err(e) if e.is_cancelled() => {
                print_report(&rows, "Action");
                return Err(e.into());
            }
            Err(e) => {
                tracing::error!(repository = %desired.reference(), error = %e, kind = %e.kind(), "apply failed");
                rows.push(ReportRow::failed(desired, e));
            }
        }
    }

    print_report(&rows, "Action");
    match failures(&rows) {
        0 => Ok(()),
        n => anyhow::bail!("{n} of {} repositories failed to apply", rows.len()),
    }
}

async fn converge(
    reconciler: &RepositoryReconciler,
    desired: &DesiredState,
    cancel: &CancellationToken,
) -> ReconcileResult<ReportRow> {
    let observation = reconciler.observe(desired, cancel).await?;
    let row = match observation.state {
        ResourceState::Missing => {
            let created = reconciler.create(desired, cancel).await?;
            ReportRow::new(desired, "created".green().to_string(), created.id)
        }
        ResourceState::OutOfDate => {
            let updated = reconciler.update(desired, cancel).await?;
            ReportRow::new(
                desired,
                "updated".green().to_string(),
                updated.id.or(observation.id),
            )
        }
        ResourceState::UpToDate => ReportRow::new(desired, "unchanged", observation.id),
    };
    Ok(row)
}
