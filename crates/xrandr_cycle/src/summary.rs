use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::report::Mode;

pub const SUMMARY_FILE: &str = "cycle_summary.json";

/// Machine-readable record of one run, archived with the screenshots.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CycleSummary {
    pub status: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub keyword: String,
    pub screenshot_dir: String,
    pub profile: String,
    pub archive: String,
    pub connected_outputs: Vec<String>,
    pub original_modes: Vec<Mode>,
    pub selected_modes: Vec<Mode>,
    pub succeeded: Vec<Mode>,
    pub failed: Vec<Mode>,
    pub screenshot_failures: Vec<Mode>,
    pub restored: Vec<Mode>,
    pub rejected_labels: Vec<String>,
    pub exit_code: i32,
}

impl CycleSummary {
    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str::<Self>(&content)?)
    }
}
