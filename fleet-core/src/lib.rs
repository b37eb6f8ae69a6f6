//! Fleet core library: roster types, identifier allocation, roster store.
//!
//! - [`types`]: newtypes and the roster model
//! - [`error`]: [`RosterError`]
//! - [`ident`]: work dirs, anchors, service names, repository references
//! - [`defaults`]: bootstrap roster providers
//! - [`roster`]: load / save / add

pub mod defaults;
pub mod error;
pub mod ident;
pub mod roster;
pub mod types;

pub use defaults::{DefaultRoster, RepoSeed, SeedList};
pub use error::RosterError;
pub use ident::{anchor_name, derive_identity, parse_repo_ref, unique_work_dir, Identity, RepoRef};
pub use types::{AnchorName, Repository, Roster, Runner, ServiceName};
