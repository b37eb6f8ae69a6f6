//! # fleet-renderer
//!
//! Tera-based renderer that turns a [`Roster`](fleet_core::types::Roster)
//! into the compose manifest consumed by the orchestration tool.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fleet_renderer::Renderer;
//! use fleet_core::types::Roster;
//!
//! fn manifest(roster: &Roster) -> Option<String> {
//!     let renderer = Renderer::new().ok()?;
//!     renderer.render(roster).ok()
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::{ManifestContext, ManifestOptions};
pub use engine::{Renderer, TemplateEngine, MANIFEST_TEMPLATE};
pub use error::RenderError;
