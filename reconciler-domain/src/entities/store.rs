// Batch write outcome reported by the persistent store

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchWriteOutcome<T> {
    pub unprocessed: Vec<T>,
}

impl<T> BatchWriteOutcome<T> {
    pub fn complete() -> Self {
        Self {
            unprocessed: Vec::new(),
        }
    }
}

impl<T> Default for BatchWriteOutcome<T> {
    fn default() -> Self {
        Self::complete()
    }
}
