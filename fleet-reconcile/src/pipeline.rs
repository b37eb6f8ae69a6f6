//! Reconciliation pipeline: walk [`Phase::ALL`] and apply each phase's
//! [`FailurePolicy`].

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use fleet_core::types::Roster;
use fleet_renderer::Renderer;

use crate::backup::backup_manifest;
use crate::compose::ComposeTool;
use crate::error::ReconcileError;
use crate::phase::{FailurePolicy, Phase, PhaseOutcome, PhaseStatus};
use crate::writer::{write_manifest, WriteResult};

pub const DEFAULT_MANIFEST: &str = "docker-compose.yml";

/// Wait between starting services and counting them.
pub const SETTLE_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub manifest: PathBuf,
    /// Stop after Validate; the deploy phases are reported as skipped.
    pub skip_deploy: bool,
    pub settle: Duration,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            manifest: PathBuf::from(DEFAULT_MANIFEST),
            skip_deploy: false,
            settle: SETTLE_DELAY,
        }
    }
}

/// Running versus expected runner count after Start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Convergence {
    pub running: usize,
    pub total: usize,
    pub expected: usize,
}

impl Convergence {
    pub fn is_converged(&self) -> bool {
        self.running == self.expected
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub phases: Vec<PhaseOutcome>,
    pub manifest: PathBuf,
    pub backup: Option<PathBuf>,
    pub write: Option<WriteResult>,
    pub convergence: Option<Convergence>,
}

impl ReconcileReport {
    fn new(manifest: PathBuf) -> Self {
        Self {
            phases: Vec::with_capacity(Phase::ALL.len()),
            manifest,
            backup: None,
            write: None,
            convergence: None,
        }
    }

    fn record(&mut self, phase: Phase, status: PhaseStatus) {
        self.phases.push(PhaseOutcome { phase, status });
    }

    pub fn status(&self, phase: Phase) -> Option<&PhaseStatus> {
        self.phases
            .iter()
            .find(|o| o.phase == phase)
            .map(|o| &o.status)
    }

    pub fn warnings(&self) -> impl Iterator<Item = (Phase, &str)> {
        self.phases.iter().filter_map(|o| match &o.status {
            PhaseStatus::Warned(message) => Some((o.phase, message.as_str())),
            _ => None,
        })
    }

    /// Whether the deploy phases ran.
    pub fn deployed(&self) -> bool {
        self.status(Phase::Start) == Some(&PhaseStatus::Done)
    }
}

/// Drives one reconciliation run against a [`ComposeTool`].
pub struct Reconciler<'a> {
    renderer: &'a Renderer,
    tool: &'a dyn ComposeTool,
    options: ReconcileOptions,
}

/// State carried between phases of one run.
struct RunState {
    rendered: String,
    report: ReconcileReport,
}

impl<'a> Reconciler<'a> {
    pub fn new(renderer: &'a Renderer, tool: &'a dyn ComposeTool, options: ReconcileOptions) -> Self {
        Self {
            renderer,
            tool,
            options,
        }
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Run every phase in order.
    ///
    /// Returns the first error of an aborting phase. Failures of warning
    /// phases, including a runner-count mismatch, are recorded in the report.
    pub fn run(&self, roster: &Roster) -> Result<ReconcileReport, ReconcileError> {
        let mut state = RunState {
            rendered: String::new(),
            report: ReconcileReport::new(self.options.manifest.clone()),
        };

        for phase in Phase::ALL {
            if phase.is_deploy() && self.options.skip_deploy {
                tracing::debug!("{phase}: skipped");
                state.report.record(phase, PhaseStatus::Skipped);
                continue;
            }
            match self.step(phase, roster, &mut state) {
                Ok(()) => state.report.record(phase, PhaseStatus::Done),
                Err(err) => match phase.policy() {
                    FailurePolicy::Abort => {
                        tracing::error!("{phase} failed: {err}");
                        return Err(err);
                    }
                    FailurePolicy::Warn => {
                        tracing::warn!("{phase}: {err}");
                        state.report.record(phase, PhaseStatus::Warned(err.to_string()));
                    }
                },
            }
        }

        if self.options.skip_deploy {
            tracing::info!("skipping deployment; manifest at {}", self.options.manifest.display());
        }
        Ok(state.report)
    }

    fn step(&self, phase: Phase, roster: &Roster, state: &mut RunState) -> Result<(), ReconcileError> {
        let manifest = self.options.manifest.as_path();
        match phase {
            Phase::Backup => {
                state.report.backup = backup_manifest(manifest, Utc::now())?;
            }
            Phase::Render => {
                state.rendered = self.renderer.render(roster)?;
            }
            Phase::Persist => {
                state.report.write = Some(write_manifest(manifest, &state.rendered)?);
            }
            Phase::Validate => {
                self.tool.validate(manifest).map_err(ReconcileError::Validation)?;
                tracing::info!("manifest {} is valid", manifest.display());
            }
            Phase::Stop => {
                tracing::info!("stopping existing runners");
                self.tool.stop(manifest).map_err(ReconcileError::Stop)?;
            }
            Phase::Pull => {
                tracing::info!("pulling runner images");
                self.tool.pull(manifest).map_err(ReconcileError::Pull)?;
            }
            Phase::Start => {
                tracing::info!("starting {} runners", roster.total_runners());
                self.tool.start(manifest).map_err(ReconcileError::Start)?;
            }
            Phase::Verify => self.verify(roster, state)?,
        }
        Ok(())
    }

    fn verify(&self, roster: &Roster, state: &mut RunState) -> Result<(), ReconcileError> {
        if !self.options.settle.is_zero() {
            tracing::info!(
                "waiting {}s for runners to start",
                self.options.settle.as_secs()
            );
            std::thread::sleep(self.options.settle);
        }

        let counts = self
            .tool
            .status(&self.options.manifest)
            .map_err(ReconcileError::Status)?;
        let convergence = Convergence {
            running: counts.running,
            total: counts.total,
            expected: roster.total_runners(),
        };
        state.report.convergence = Some(convergence);

        if convergence.is_converged() {
            tracing::info!("all {} runners are running", convergence.expected);
            return Ok(());
        }
        tracing::warn!(
            "check logs with: {} -f {} logs",
            self.tool.display_name(),
            self.options.manifest.display()
        );
        Err(ReconcileError::NotConverged {
            running: convergence.running,
            expected: convergence.expected,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
