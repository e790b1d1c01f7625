use std::{fs, path::PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{logging, machine::MachineBuilder};

fn default_log_filter() -> String {
    "info".to_string()
}

/// Machine description loaded from JSON.
///
/// ```json
/// { "bios": "roms/segaai.bin", "card": "roms/cards/tetris.bin", "log_filter": "segaai=trace" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineConfig {
    pub bios: PathBuf,
    #[serde(default)]
    pub card: Option<PathBuf>,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl MachineConfig {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let json =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn init_logging(&self) {
        logging::init(&self.log_filter);
    }

    pub fn builder(&self) -> anyhow::Result<MachineBuilder> {
        let mut builder = MachineBuilder::new().bios_file(&self.bios)?;
        if let Some(card) = &self.card {
            builder = builder.card_file(card)?;
        }
        Ok(builder)
    }
}
