use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemSuccess {
    pub key: String,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub key: String,
    pub reason: String,
}

/// Outcome of the per-object operations of one stage, in the order they ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ItemSummary {
    pub succeeded: Vec<ItemSuccess>,
    pub failed: Vec<ItemFailure>,
}

impl ItemSummary {
    pub fn record(&mut self, outcome: Result<ItemSuccess, ItemFailure>) {
        match outcome {
            Ok(success) => self.succeeded.push(success),
            Err(failure) => self.failed.push(failure),
        }
    }

    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// True when every attempted item succeeded, including when nothing was attempted.
    pub fn is_complete(&self) -> bool {
        self.succeeded_count() == self.attempted()
    }
}
