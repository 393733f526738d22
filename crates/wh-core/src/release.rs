use std::collections::BTreeMap;

use wh_types::{BranchId, Generation};

/// Branches collected from every feed, waiting to be announced.
#[derive(Debug, Default)]
pub struct ReleaseQueue {
    pending: BTreeMap<BranchId, Option<Generation>>,
}

impl ReleaseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a branch with its last known generation. A branch queued twice
    /// keeps the latest generation.
    pub fn push(&mut self, branch: BranchId, generation: Option<Generation>) {
        self.pending.insert(branch, generation);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn contains(&self, branch: &BranchId) -> bool {
        self.pending.contains_key(branch)
    }

    /// Keep only the branches for which `keep` returns `true`. Returns the
    /// number dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&BranchId) -> bool) -> usize {
        let before = self.pending.len();
        self.pending.retain(|branch, _| keep(branch));
        before - self.pending.len()
    }

    /// Empty the queue into batches of at most `batch_size` entries.
    pub fn drain_batches(&mut self, batch_size: usize) -> Vec<BTreeMap<BranchId, Option<Generation>>> {
        let size = batch_size.max(1);
        let mut batches = Vec::new();
        let mut current = BTreeMap::new();
        for (branch, generation) in std::mem::take(&mut self.pending) {
            current.insert(branch, generation);
            if current.len() == size {
                batches.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            batches.push(current);
        }
        batches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_are_bounded() {
        let mut queue = ReleaseQueue::new();
        for i in 0..120 {
            queue.push(BranchId::new(format!("w@{i:03}")), Some(i));
        }
        let batches = queue.drain_batches(50);
        assert_eq!(
            batches.iter().map(BTreeMap::len).collect::<Vec<_>>(),
            vec![50, 50, 20]
        );
        assert!(queue.is_empty());
        assert!(queue.drain_batches(50).is_empty());
    }

    #[test]
    fn requeue_keeps_latest_generation() {
        let mut queue = ReleaseQueue::new();
        let id = BranchId::new("w@1");
        queue.push(id.clone(), Some(1));
        queue.push(id.clone(), Some(2));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain_batches(0)[0][&id], Some(2));
    }

    #[test]
    fn retain_drops_rejected() {
        let mut queue = ReleaseQueue::new();
        queue.push(BranchId::new("w@1"), None);
        queue.push(BranchId::new("w@2"), None);
        assert_eq!(queue.retain(|b| b.as_str() == "w@2"), 1);
        assert!(queue.contains(&BranchId::new("w@2")));
        assert!(!queue.contains(&BranchId::new("w@1")));
    }
}
