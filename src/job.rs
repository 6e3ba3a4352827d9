//! Work-item bookkeeping records
//!
//! Callers that track higher-level work items (chain operations, import
//! batches) attach one of these to a transfer. The policy layer carries the
//! record untouched; all fields are caller-defined.

use serde::{Deserialize, Serialize};

/// Bookkeeping record for a higher-level work item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Caller-assigned identifier
    pub id: u64,
    /// Caller-defined status code
    pub status: i32,
    /// Caller-defined category code
    pub category: i32,
    /// Free-form reference, e.g. the operation that spawned the item
    pub reference: String,
}

impl Job {
    /// Create an empty record with the given identifier
    pub fn new(id: u64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_is_zeroed() {
        let job = Job::new(7);
        assert_eq!(job.id, 7);
        assert_eq!(job.status, 0);
        assert_eq!(job.category, 0);
        assert!(job.reference.is_empty());
    }
}
