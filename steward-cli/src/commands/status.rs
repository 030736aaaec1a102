//! `steward status`: drift visibility across tracked users.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use steward_sync::status::{format_datetime_age, status_all, StatusEntry};
use steward_sync::StatusSignal;

/// Arguments for `steward status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let entries = load_entries(&home)?;
        if self.json {
            print_json(entries)?;
            return Ok(());
        }

        print_table(entries);
        Ok(())
    }
}

fn load_entries(home: &Path) -> Result<Vec<StatusEntry>> {
    status_all(home).context("failed to read ~/.steward/state")
}

#[derive(Serialize)]
struct StatusReportJson {
    summary: StatusSummaryJson,
    users: Vec<UserStatusJson>,
}

#[derive(Serialize)]
struct StatusSummaryJson {
    tracked: usize,
    pending: usize,
    orphaned: usize,
}

#[derive(Serialize)]
struct UserStatusJson {
    name: String,
    identity: String,
    status: String,
    detail: String,
    applied_at: String,
    applied_age: String,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "identity")]
    identity: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "detail")]
    detail: String,
    #[tabled(rename = "last apply")]
    last_apply: String,
}

fn count(entries: &[StatusEntry], pred: impl Fn(&StatusSignal) -> bool) -> usize {
    entries.iter().filter(|e| pred(&e.signal)).count()
}

fn print_json(entries: Vec<StatusEntry>) -> Result<()> {
    let payload = StatusReportJson {
        summary: StatusSummaryJson {
            tracked: entries.len(),
            pending: count(&entries, |s| matches!(s, StatusSignal::Pending { .. })),
            orphaned: count(&entries, |s| matches!(s, StatusSignal::Orphaned { .. })),
        },
        users: entries
            .into_iter()
            .map(|e| UserStatusJson {
                detail: signal_detail(&e.signal),
                status: e.signal.label().to_string(),
                name: e.name,
                identity: e.identity.encode(),
                applied_at: e.applied_at.to_rfc3339(),
                applied_age: format_datetime_age(e.applied_at),
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(entries: Vec<StatusEntry>) {
    let pending = count(&entries, |s| matches!(s, StatusSignal::Pending { .. }));
    println!(
        "Steward v{} | {} tracked | {} pending",
        env!("CARGO_PKG_VERSION"),
        entries.len(),
        pending,
    );

    if entries.is_empty() {
        println!("No users tracked.");
        return;
    }

    let rows: Vec<StatusTableRow> = entries
        .into_iter()
        .map(|e| StatusTableRow {
            status: format!("{} {}", signal_indicator(&e.signal), e.signal.label().to_uppercase()),
            detail: signal_detail(&e.signal),
            name: e.name,
            identity: e.identity.encode(),
            last_apply: format!("{} ago", format_datetime_age(e.applied_at)),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if pending > 0 {
        println!("Run 'steward apply <name> <manifest>' to converge pending users.");
    }
}

fn signal_indicator(signal: &StatusSignal) -> String {
    match signal {
        StatusSignal::Untracked => "■".bright_black().bold().to_string(),
        StatusSignal::InSync => "■".green().bold().to_string(),
        StatusSignal::Pending { .. } => "■".yellow().bold().to_string(),
        StatusSignal::Orphaned { .. } => "■".magenta().bold().to_string(),
    }
}

fn signal_detail(signal: &StatusSignal) -> String {
    match signal {
        StatusSignal::Untracked => "not tracked".to_string(),
        StatusSignal::InSync => "up to date".to_string(),
        StatusSignal::Pending { reason } => reason.clone(),
        StatusSignal::Orphaned { manifest } => format!("manifest {} is gone", manifest.display()),
    }
}
