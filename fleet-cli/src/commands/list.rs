//! `fleet list` — roster visibility.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use fleet_core::types::Roster;

use super::RosterArgs;

/// Arguments for `fleet list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub roster: RosterArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl ListArgs {
    pub fn run(self) -> Result<()> {
        let roster = self.roster.load()?;
        let rows = rows(&roster);
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("failed to serialize roster JSON")?
            );
            return Ok(());
        }
        print_table(&roster, rows);
        Ok(())
    }
}

/// One runner. Tokens are never printed.
#[derive(Debug, Serialize, Tabled)]
struct RunnerRow {
    #[tabled(rename = "repository")]
    repository: String,
    #[tabled(rename = "anchor")]
    anchor: String,
    #[tabled(rename = "service")]
    service: String,
    #[tabled(rename = "runner")]
    runner: String,
    #[tabled(rename = "work dir")]
    work_dir: String,
}

fn rows(roster: &Roster) -> Vec<RunnerRow> {
    roster
        .repositories
        .iter()
        .flat_map(|repo| {
            repo.runners.iter().map(move |runner| RunnerRow {
                repository: repo.slug(),
                anchor: repo.anchor_name.0.clone(),
                service: runner.service_name.0.clone(),
                runner: runner.runner_name.clone(),
                work_dir: runner.work_dir.clone(),
            })
        })
        .collect()
}

fn print_table(roster: &Roster, rows: Vec<RunnerRow>) {
    println!(
        "fleet v{} | {} repositories | {} runners",
        env!("CARGO_PKG_VERSION"),
        roster.repositories.len(),
        roster.total_runners(),
    );
    if rows.is_empty() {
        println!("No runners in roster. Add some with {}.", "fleet run --repos".bold());
        return;
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
