use anyhow::Result;
use bbsync_reconciler::{DesiredState, RepositoryReconciler};
use tokio_util::sync::CancellationToken;

use crate::output::{ReportRow, failures, print_report, state_label};

pub async fn observe(
    reconciler: &RepositoryReconciler,
    repositories: &[&DesiredState],
    cancel: &CancellationToken,
) -> Result<()> {
    let mut rows = Vec::with_capacity(repositories.len());
    for desired in repositories {
        match reconciler.observe(desired, cancel).await {
            Ok(observation) => {
                rows.push(ReportRow::new(desired, state_label(observation.state), observation.id));
            }
            Err(e) if e.is_cancelled() => {
                print_report(&rows, "State");
                return Err(e.into());
            }
            Err(e) => rows.push(ReportRow::failed(desired, e)),
        }
    }

    print_report(&rows, "State");
    match failures(&rows) {
        0 => Ok(()),
        n => anyhow::bail!("{n} of {} repositories could not be observed", rows.len()),
    }
}
