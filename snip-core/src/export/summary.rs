use serde::Serialize;

/// Outcome of one export run. Created empty when the run starts, updated
/// tile by tile by the orchestrator's sequential loop, immutable once
/// returned.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ExportSummary {
    pub total: usize,
    pub success_count: usize,
    pub failed_count: usize,
    /// Tile indexes that failed, in processing order.
    pub failed_indexes: Vec<usize>,
    pub permission_denied_count: usize,
    pub save_failed_count: usize,
    pub permission_denied: bool,
    /// Only the first error is kept; later ones are dropped silently.
    pub first_error_message: Option<String>,
}

impl ExportSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    fn note_error(&mut self, message: &str) {
        if self.first_error_message.is_none() {
            self.first_error_message = Some(message.to_string());
        }
    }

    pub(crate) fn record_success(&mut self) {
        self.success_count += 1;
    }

    /// Non-fatal per-tile failure: the loop moves on to the next tile.
    pub(crate) fn record_save_failure(&mut self, index: usize, message: &str) {
        self.save_failed_count += 1;
        self.failed_count += 1;
        self.failed_indexes.push(index);
        self.note_error(message);
    }

    /// Permission denial: the failing tile and every not-yet-processed
    /// tile are marked failed in one step.
    pub(crate) fn record_permission_failure<I>(&mut self, indexes: I, message: &str)
    where
        I: IntoIterator<Item = usize>,
    {
        self.permission_denied = true;
        self.permission_denied_count += 1;
        self.note_error(message);
        for index in indexes {
            self.failed_count += 1;
            self.failed_indexes.push(index);
        }
    }
}
