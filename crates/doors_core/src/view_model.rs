use std::path::PathBuf;

use crate::state::RunStatus;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunViewModel {
    pub status: RunStatus,
    pub page: u32,
    pub range_text: String,
    pub record_count: usize,
    pub fraction: Option<f64>,
    pub outputs: Vec<PathBuf>,
    pub log: Vec<String>,
    pub last_error: Option<String>,
    pub dirty: bool,
}

impl RunViewModel {
    /// One-line status, e.g. `running | page 3 (51-75) | 62 records | 40%`.
    pub fn status_line(&self) -> String {
        let mut line = format!("{:?}", self.status).to_lowercase();
        if self.page > 0 {
            line.push_str(&format!(" | page {} {}", self.page, self.range_text));
        }
        line.push_str(&format!(" | {} records", self.record_count));
        if let Some(fraction) = self.fraction {
            line.push_str(&format!(" | {:.0}%", fraction * 100.0));
        }
        line
    }
}
