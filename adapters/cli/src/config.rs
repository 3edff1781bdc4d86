//! Loads session tuning from TOML and layers command-line overrides on top.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use worm_bricks_core::Tuning;

/// Values supplied on the command line that take precedence over the file.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Overrides {
    pub(crate) seed: Option<u64>,
    pub(crate) worm_count: Option<u32>,
    pub(crate) cell_size: Option<f32>,
}

impl Overrides {
    pub(crate) fn apply(self, mut tuning: Tuning) -> Tuning {
        if let Some(seed) = self.seed {
            tuning.seed = seed;
        }
        if let Some(worm_count) = self.worm_count {
            tuning.worm_count = worm_count;
        }
        if let Some(cell_size) = self.cell_size {
            tuning.cell_size = cell_size;
        }
        tuning
    }
}

/// Reads tuning from `path`, falling back to defaults when no file is given.
pub(crate) fn load_tuning(path: Option<&Path>) -> Result<Tuning> {
    let Some(path) = path else {
        return Ok(Tuning::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse_tuning(&contents).with_context(|| format!("invalid config file {}", path.display()))
}

pub(crate) fn parse_tuning(contents: &str) -> Result<Tuning> {
    toml::from_str(contents).context("failed to parse tuning")
}

/// Renders tuning as TOML, suitable as a starting config file.
pub(crate) fn render_tuning(tuning: &Tuning) -> Result<String> {
    toml::to_string_pretty(tuning).context("failed to serialize tuning")
}
