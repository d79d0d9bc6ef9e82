//! Submission queue for URLs awaiting a crawl.
//!
//! The queue is owned by the server instance and shared behind an `Arc`.
//! The lock is held only for an append or a snapshot-and-clear, never across
//! I/O, so submitters and drainers never wait on the network.

use parking_lot::Mutex;

use crate::error::{MarineError, Result};

/// Ordered, unbounded batch of pending URLs.
#[derive(Debug, Default)]
pub struct SubmissionQueue {
    pending: Mutex<Vec<String>>,
}

impl SubmissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a URL. Always succeeds.
    ///
    /// Returns the queue length after the append.
    pub fn submit(&self, url: impl Into<String>) -> usize {
        let mut pending = self.pending.lock();
        pending.push(url.into());
        pending.len()
    }

    /// Atomically take every queued URL in submission order, leaving the queue
    /// empty.
    ///
    /// Fails with [`MarineError::EmptyQueue`] when nothing is queued; the queue
    /// is left untouched in that case.
    pub fn drain(&self) -> Result<Vec<String>> {
        let mut pending = self.pending.lock();
        if pending.is_empty() {
            return Err(MarineError::EmptyQueue);
        }
        Ok(std::mem::take(&mut *pending))
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_drain_returns_submission_order() {
        let queue = SubmissionQueue::new();
        queue.submit("a");
        queue.submit("b");

        assert_eq!(queue.drain().unwrap(), vec!["a".to_string(), "b".to_string()]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drain_empty_queue_fails() {
        let queue = SubmissionQueue::new();
        assert!(matches!(queue.drain(), Err(MarineError::EmptyQueue)));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_second_drain_after_success_fails() {
        let queue = SubmissionQueue::new();
        queue.submit("a");
        queue.drain().unwrap();
        assert!(matches!(queue.drain(), Err(MarineError::EmptyQueue)));
    }

    #[test]
    fn test_duplicates_are_kept() {
        let queue = SubmissionQueue::new();
        queue.submit("a");
        queue.submit("a");
        assert_eq!(queue.drain().unwrap().len(), 2);
    }

    #[test]
    fn test_concurrent_submissions_are_not_lost() {
        let queue = Arc::new(SubmissionQueue::new());
        let threads: Vec<_> = (0..8)
            .map(|t| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..250 {
                        queue.submit(format!("https://site.example/{}/{}", t, i));
                    }
                })
            })
            .collect();

        for handle in threads {
            handle.join().unwrap();
        }

        assert_eq!(queue.len(), 2000);
    }

    #[test]
    fn test_concurrent_drains_never_share_a_url() {
        let queue = Arc::new(SubmissionQueue::new());

        let submitter = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..5000 {
                    queue.submit(format!("u{}", i));
                }
            })
        };

        let drainers: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    for _ in 0..500 {
                        if let Ok(batch) = queue.drain() {
                            seen.extend(batch);
                        }
                    }
                    seen
                })
            })
            .collect();

        submitter.join().unwrap();
        let mut all: Vec<String> = drainers
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        if let Ok(rest) = queue.drain() {
            all.extend(rest);
        }

        let unique: HashSet<_> = all.iter().cloned().collect();
        assert_eq!(unique.len(), all.len(), "a URL was drained twice");
        assert_eq!(all.len(), 5000, "a URL was lost");
    }
}
