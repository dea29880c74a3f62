use crate::config::ExtractConfig;

/// Naming scheme for screenshots assigned by sorted position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthLabels {
    pub year: u16,
    pub summary_label: String,
    pub summary_id: String,
    pub label_suffix: String,
}

impl MonthLabels {
    pub fn from_config(config: &ExtractConfig) -> Self {
        Self {
            year: config.year,
            summary_label: config.summary_label.clone(),
            summary_id: config.summary_id.clone(),
            label_suffix: config.month_label_suffix.clone(),
        }
    }

    /// Returns `(month_label, month_id)` for the screenshot at `index`.
    ///
    /// Index 0 is the yearly summary; index `n` is month `n`. Indices past 12
    /// keep counting rather than wrapping.
    pub fn month_for_index(&self, index: usize) -> (String, String) {
        if index == 0 {
            return (self.summary_label.clone(), self.summary_id.clone());
        }
        (
            format!("{index}{}", self.label_suffix),
            format!("{}-{index:02}", self.year),
        )
    }
}
