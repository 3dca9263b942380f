mod errors;
mod orchestrator;

use std::fmt;

use clap::ValueEnum;

use crate::types::Layer;

pub use errors::StageError;
pub use orchestrator::Orchestrator;

/// Which layers a pipeline run executes.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum RunMode {
    /// Bronze, silver and gold.
    Complete,
    BronzeOnly,
    /// Bronze extraction feeding silver, without gold.
    SilverOnly,
    /// Gold over the current silver table.
    GoldOnly
}

impl RunMode {
    pub fn layers(&self) -> &'static [Layer] {
        match self {
            RunMode::Complete => &Layer::ALL,
            RunMode::BronzeOnly => &[Layer::Bronze],
            RunMode::SilverOnly => &[Layer::Bronze, Layer::Silver],
            RunMode::GoldOnly => &[Layer::Gold]
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunMode::Complete => "complete",
            RunMode::BronzeOnly => "bronze-only",
            RunMode::SilverOnly => "silver-only",
            RunMode::GoldOnly => "gold-only"
        };

        f.write_str(name)
    }
}
