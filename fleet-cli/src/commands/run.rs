//! `fleet run` — one reconciliation run.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use fleet_core::roster::{add_repositories, save_at};
use fleet_credentials::{refresh_all, GithubClient, DEFAULT_API_URL};
use fleet_reconcile::{
    DockerCompose, ReconcileOptions, ReconcileReport, Reconciler, WriteResult, DEFAULT_MANIFEST,
};
use fleet_renderer::{ManifestOptions, Renderer};

use super::RosterArgs;

/// Arguments for `fleet run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// GitHub token allowed to create runner registration tokens.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Comma-separated repositories to add (`owner/repo` or a GitHub URL).
    #[arg(long)]
    pub repos: Option<String>,

    #[command(flatten)]
    pub roster: RosterArgs,

    /// Runners per newly added repository.
    #[arg(long, default_value_t = 2, value_parser = runner_count)]
    pub runners: usize,

    /// Write and validate the manifest but leave containers alone.
    #[arg(long)]
    pub skip_docker: bool,

    /// Compose manifest to write.
    #[arg(long, default_value = DEFAULT_MANIFEST)]
    pub manifest: PathBuf,

    /// Compose command line, e.g. "docker compose".
    #[arg(long, default_value = "docker-compose")]
    pub compose: String,

    #[arg(long, default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Runner container image.
    #[arg(long)]
    pub image: Option<String>,

    /// Comma-separated runner labels.
    #[arg(long)]
    pub labels: Option<String>,

    /// Directory with a `compose.yml.tera` overriding the built-in template.
    #[arg(long)]
    pub templates: Option<PathBuf>,

    /// Seconds to wait after starting runners before counting them.
    #[arg(long, default_value_t = 10)]
    pub settle_secs: u64,

    /// Emit the run report as JSON.
    #[arg(long)]
    pub json: bool,
}

fn runner_count(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        if self.token.trim().is_empty() {
            bail!("a GitHub token is required (--token or GITHUB_TOKEN)");
        }

        let mut roster = self.roster.load()?;

        if let Some(list) = self.repos.as_deref() {
            let summary = add_repositories(&mut roster, list, self.runners);
            for slug in &summary.added {
                println!("{} {slug}", "+".green().bold());
            }
            if summary.changed() {
                // The run continues with the in-memory roster either way.
                if let Err(err) = save_at(&self.roster.config, &roster) {
                    tracing::warn!("failed to save roster: {err}");
                }
            }
        }

        let client = GithubClient::with_api_url(self.token.as_str(), self.api_url.as_str());
        let refreshed = refresh_all(&mut roster, &client)
            .context("failed to refresh runner registration tokens")?;
        tracing::info!("refreshed {refreshed} registration tokens");

        let renderer = Renderer::with_options(self.manifest_options(), self.templates.as_deref())
            .context("failed to load manifest template")?;
        let tool = DockerCompose::from_command_line(&self.compose);
        let options = ReconcileOptions {
            manifest: self.manifest.clone(),
            skip_deploy: self.skip_docker,
            settle: Duration::from_secs(self.settle_secs),
        };

        let report = Reconciler::new(&renderer, &tool, options)
            .run(&roster)
            .context("reconciliation failed")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize run report")?
            );
        } else {
            print_report(&report, roster.total_runners());
        }
        Ok(())
    }

    fn manifest_options(&self) -> ManifestOptions {
        let defaults = ManifestOptions::default();
        ManifestOptions {
            image: self.image.clone().unwrap_or(defaults.image),
            labels: self.labels.clone().unwrap_or(defaults.labels),
            runner_scope: defaults.runner_scope,
        }
    }
}

fn print_report(report: &ReconcileReport, expected: usize) {
    if let Some(backup) = &report.backup {
        println!("  ·  backup {}", backup.display());
    }
    match &report.write {
        Some(WriteResult::Written { path, digest }) => {
            println!("  ✎  {} ({})", path.display(), short(digest));
        }
        Some(WriteResult::Unchanged { path, .. }) => {
            println!("  ·  {} unchanged", path.display());
        }
        None => {}
    }

    for (phase, message) in report.warnings() {
        println!("{} {phase}: {message}", "!".yellow().bold());
    }

    if !report.deployed() {
        println!("{} manifest ready; deployment skipped", "✓".green());
        return;
    }
    match report.convergence {
        Some(c) if c.is_converged() => {
            println!("{} {}/{} runners running", "✓".green(), c.running, c.expected);
        }
        Some(c) => {
            println!(
                "{} {}/{} runners running",
                "!".yellow().bold(),
                c.running,
                c.expected
            );
        }
        None => println!("{} {expected} runners started", "✓".green()),
    }
}

fn short(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runner_count_must_be_positive() {
        assert_eq!(runner_count("3"), Ok(3));
        assert!(runner_count("0").is_err());
        assert!(runner_count("-1").is_err());
    }

    #[test]
    fn short_digest_is_prefix() {
        assert_eq!(short("0123456789abcdef"), "0123456789ab");
        assert_eq!(short("abc"), "abc");
    }
}
