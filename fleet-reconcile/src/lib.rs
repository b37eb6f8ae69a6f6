//! # fleet-reconcile
//!
//! Converges running runner containers on a roster: back up the previous
//! manifest, render, write atomically, validate, redeploy and verify.
//!
//! Build a [`Reconciler`] from a [`Renderer`](fleet_renderer::Renderer), a
//! [`ComposeTool`] and [`ReconcileOptions`], then call [`Reconciler::run`].

pub mod backup;
pub mod compose;
pub mod error;
pub mod phase;
pub mod pipeline;
pub mod writer;

pub use compose::{ComposeTool, DockerCompose, ServiceCounts};
pub use error::{ComposeError, ReconcileError};
pub use phase::{FailurePolicy, Phase, PhaseOutcome, PhaseStatus};
pub use pipeline::{
    Convergence, ReconcileOptions, ReconcileReport, Reconciler, DEFAULT_MANIFEST, SETTLE_DELAY,
};
pub use writer::{write_manifest, WriteResult};
