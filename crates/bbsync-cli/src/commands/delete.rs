use anyhow::Result;
use bbsync_client::ErrorKind;
use bbsync_reconciler::{DesiredState, RepositoryReconciler};
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use crate::output::{ReportRow, failures, print_report};

pub async fn delete(
    reconciler: &RepositoryReconciler,
    repositories: &[&DesiredState],
    cancel: &CancellationToken,
) -> Result<()> {
    let mut rows = Vec::with_capacity(repositories.len());
    for desired in repositories {
        match reconciler.delete(desired, cancel).await {
            Ok(()) => rows.push(ReportRow::new(desired, "deleted".green().to_string(), None)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                rows.push(ReportRow::new(desired, "absent", None));
            }
            Err(e) if e.is_cancelled() => {
                print_report(&rows, "Result");
                return Err(e.into());
            }
            Err(e) => rows.push(ReportRow::failed(desired, e)),
        }
    }

    print_report(&rows, "Result");
    match failures(&rows) {
        0 => Ok(()),
        n => anyhow::bail!("{n} of {} repositories could not be deleted", rows.len()),
    }
}
