use bbsync_reconciler::{DesiredState, ResourceState};
use colored::Colorize;
use tabled::builder::Builder;
use tabled::settings::Style;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// One line of a per-repository report.
pub struct ReportRow {
    pub project: String,
    pub name: String,
    pub status: String,
    pub id: Option<i64>,
    pub failed: bool,
}

impl ReportRow {
    pub fn new(desired: &DesiredState, status: impl Into<String>, id: Option<i64>) -> Self {
        Self {
            project: desired.project.clone(),
            name: desired.name.clone(),
            status: status.into(),
            id,
            failed: false,
        }
    }

    pub fn failed(desired: &DesiredState, error: impl std::fmt::Display) -> Self {
        Self {
            failed: true,
            ..Self::new(desired, format!("error: {error}"), None)
        }
    }
}

pub fn state_label(state: ResourceState) -> String {
    match state {
        ResourceState::Missing | ResourceState::OutOfDate => state.as_str().yellow().to_string(),
        ResourceState::UpToDate => state.as_str().green().to_string(),
    }
}

pub fn print_report(rows: &[ReportRow], status_header: &str) {
    if rows.is_empty() {
        println!("No repositories declared.");
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(["Project", "Repository", status_header, "ID"]);
    for row in rows {
        let status = if row.failed {
            row.status.red().to_string()
        } else {
            row.status.clone()
        };
        let id = row.id.map_or_else(|| "-".to_string(), |id| id.to_string());
        builder.push_record([row.project.clone(), row.name.clone(), status, id]);
    }
    let table = builder.build().with(Style::rounded()).to_string();
    println!("{table}");
}

/// Number of failed rows.
pub fn failures(rows: &[ReportRow]) -> usize {
    rows.iter().filter(|row| row.failed).count()
}
