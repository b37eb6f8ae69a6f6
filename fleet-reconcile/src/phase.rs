//! The reconciliation phase table.

use std::fmt;

use serde::Serialize;

/// What a failing phase does to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the run and return the error.
    Abort,
    /// Record a warning and continue with the next phase.
    Warn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Backup,
    Render,
    Persist,
    Validate,
    Stop,
    Pull,
    Start,
    Verify,
}

impl Phase {
    /// Execution order.
    pub const ALL: [Phase; 8] = [
        Phase::Backup,
        Phase::Render,
        Phase::Persist,
        Phase::Validate,
        Phase::Stop,
        Phase::Pull,
        Phase::Start,
        Phase::Verify,
    ];

    pub fn policy(self) -> FailurePolicy {
        match self {
            Phase::Backup | Phase::Stop | Phase::Pull | Phase::Verify => FailurePolicy::Warn,
            Phase::Render | Phase::Persist | Phase::Validate | Phase::Start => {
                FailurePolicy::Abort
            }
        }
    }

    /// Phases that touch running containers; skipped with `skip_deploy`.
    pub fn is_deploy(self) -> bool {
        matches!(self, Phase::Stop | Phase::Pull | Phase::Start | Phase::Verify)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Backup => "backup",
            Phase::Render => "render",
            Phase::Persist => "persist",
            Phase::Validate => "validate",
            Phase::Stop => "stop",
            Phase::Pull => "pull",
            Phase::Start => "start",
            Phase::Verify => "verify",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum PhaseStatus {
    Done,
    Skipped,
    Warned(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseOutcome {
    pub phase: Phase,
    pub status: PhaseStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_render_persist_validate_and_start_abort() {
        let aborting: Vec<Phase> = Phase::ALL
            .into_iter()
            .filter(|p| p.policy() == FailurePolicy::Abort)
            .collect();
        assert_eq!(
            aborting,
            [Phase::Render, Phase::Persist, Phase::Validate, Phase::Start]
        );
    }

    #[test]
    fn deploy_phases_follow_validate() {
        let first_deploy = Phase::ALL.iter().position(|p| p.is_deploy());
        let validate = Phase::ALL.iter().position(|p| *p == Phase::Validate);
        assert_eq!(first_deploy, validate.map(|i| i + 1));
        assert!(Phase::ALL[4..].iter().all(|p| p.is_deploy()));
    }
}
