pub mod list;
pub mod run;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use fleet_core::{
    roster::{self, DEFAULT_ROSTER_FILE},
    types::Roster,
    SeedList,
};

/// Where the roster lives and how to bootstrap it.
#[derive(Args, Debug, Clone)]
pub struct RosterArgs {
    /// Roster file.
    #[arg(long, default_value = DEFAULT_ROSTER_FILE)]
    pub config: PathBuf,

    /// JSON seed list used when the roster file does not exist yet.
    #[arg(long)]
    pub seed: Option<PathBuf>,
}

impl RosterArgs {
    pub fn load(&self) -> Result<Roster> {
        let seeds = match &self.seed {
            Some(path) => SeedList::from_file(path)
                .with_context(|| format!("failed to load seed file {}", path.display()))?,
            None => SeedList::builtin(),
        };
        roster::load_at(&self.config, &seeds)
            .with_context(|| format!("failed to load roster {}", self.config.display()))
    }
}
