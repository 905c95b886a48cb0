use std::fs;
use std::path::Path;

use anyhow::Context;
use nvl::NvFlags;
use nvl_store::UnpackLimits;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub ignore_case: bool,
    pub no_unique: bool,
    pub limits: UnpackLimits,
}

impl CliConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn flags(&self) -> NvFlags {
        let mut flags = NvFlags::NONE;
        if self.ignore_case {
            flags = flags | NvFlags::IGNORE_CASE;
        }
        if self.no_unique {
            flags = flags | NvFlags::NO_UNIQUE;
        }
        flags
    }
}
