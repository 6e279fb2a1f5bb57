//! Append-only checkpoint list.
//!
//! One indexing job writes, any number of readers look up. Appends are
//! published under a short write lock and rejected unless they extend the list
//! strictly, so readers always observe a sorted, gap-free prefix.

use crate::record::Checkpoint;
use parking_lot::RwLock;

#[derive(Debug, Default)]
pub struct CheckpointList {
    entries: RwLock<Vec<Checkpoint>>,
}

impl CheckpointList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the `{1, 0}` seed if the list is still empty
    pub fn seed(&self) {
        let mut entries = self.entries.write();
        if entries.is_empty() {
            entries.push(Checkpoint::START);
        }
    }

    /// Append `checkpoint` if both its line and offset exceed the last entry.
    ///
    /// Returns whether the checkpoint was published.
    pub fn publish(&self, checkpoint: Checkpoint) -> bool {
        let mut entries = self.entries.write();
        match entries.last() {
            Some(last) if checkpoint.line <= last.line || checkpoint.offset <= last.offset => false,
            _ => {
                entries.push(checkpoint);
                true
            }
        }
    }

    /// Greatest checkpoint with `line <= target_line`, or the seed when none qualifies
    pub fn nearest(&self, target_line: u64) -> Checkpoint {
        let entries = self.entries.read();
        let idx = entries.partition_point(|c| c.line <= target_line);
        if idx == 0 {
            Checkpoint::START
        } else {
            entries[idx - 1]
        }
    }

    pub fn last(&self) -> Option<Checkpoint> {
        self.entries.read().last().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Copy of the current entries
    pub fn to_vec(&self) -> Vec<Checkpoint> {
        self.entries.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(points: &[(u64, u64)]) -> CheckpointList {
        let list = CheckpointList::new();
        list.seed();
        for &(line, offset) in points {
            assert!(list.publish(Checkpoint::new(line, offset)));
        }
        list
    }

    #[test]
    fn test_empty_list_returns_seed() {
        let list = CheckpointList::new();
        assert!(list.is_empty());
        assert_eq!(list.nearest(500), Checkpoint::START);
    }

    #[test]
    fn test_seed_is_idempotent() {
        let list = CheckpointList::new();
        list.seed();
        list.seed();
        assert_eq!(list.to_vec(), vec![Checkpoint::START]);
    }

    #[test]
    fn test_nearest_lookup() {
        let list = list(&[(11, 100), (21, 230), (31, 370)]);
        assert_eq!(list.nearest(1), Checkpoint::START);
        assert_eq!(list.nearest(10), Checkpoint::START);
        assert_eq!(list.nearest(11), Checkpoint::new(11, 100));
        assert_eq!(list.nearest(29), Checkpoint::new(21, 230));
        assert_eq!(list.nearest(10_000), Checkpoint::new(31, 370));
    }

    #[test]
    fn test_publish_rejects_non_increasing() {
        let list = list(&[(11, 100)]);
        assert!(!list.publish(Checkpoint::new(11, 120)));
        assert!(!list.publish(Checkpoint::new(12, 100)));
        assert!(!list.publish(Checkpoint::new(5, 50)));
        assert_eq!(list.len(), 2);
        assert_eq!(list.last(), Some(Checkpoint::new(11, 100)));
    }
}
