//! The set of not-yet-processed requests for a single run.
//!
//! A `Frontier` is owned by exactly one run loop; concurrent page tasks hand
//! their discoveries back to the loop instead of touching the queue.

use std::collections::{HashSet, VecDeque};

use crate::request::CrawlRequest;

#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<CrawlRequest>,
    /// Unique keys of every request ever accepted this run.
    seen: HashSet<String>,
    budget: usize,
    dispatched: usize,
}

impl Frontier {
    pub fn new(budget: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            seen: HashSet::new(),
            budget,
            dispatched: 0,
        }
    }

    /// Enqueue a request unless its URL was already accepted this run.
    pub fn push(&mut self, request: CrawlRequest) -> bool {
        if !self.seen.insert(request.unique_key()) {
            return false;
        }
        self.queue.push_back(request);
        true
    }

    /// Put a failed request back for another attempt.
    ///
    /// Retries go to the front and do not consume budget again.
    pub fn retry(&mut self, mut request: CrawlRequest) {
        request.retries += 1;
        self.queue.push_front(request);
    }

    /// Next request to process, or `None` once the queue is empty or the
    /// budget is spent.
    pub fn next(&mut self) -> Option<CrawlRequest> {
        let front = self.queue.front()?;
        let is_retry = front.retries > 0;
        if !is_retry && self.dispatched >= self.budget {
            return None;
        }
        let request = self.queue.pop_front()?;
        if !is_retry {
            self.dispatched += 1;
        }
        Some(request)
    }

    /// Budget spent while work is still queued.
    pub fn is_exhausted(&self) -> bool {
        self.dispatched >= self.budget && !self.queue.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn dispatched(&self) -> usize {
        self.dispatched
    }
}
