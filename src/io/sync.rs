//! Approximate-time pairing of detection lists with depth images.
//!
//! Each stream is buffered in a bounded queue. The older of the two queue
//! heads is matched against the other head, which is its closest
//! counterpart as long as both streams arrive in time order. A pair is only
//! emitted once no later message could be a better match; heads that can
//! never be matched within `max_interval` are dropped.

use std::collections::VecDeque;

use tracing::warn;

use crate::config::PublisherConfig;
use crate::system::messages::{DepthImage, DetectionList};

const NS_PER_MS: u64 = 1_000_000;

/// Anything carrying a capture timestamp.
pub trait Stamped {
    fn timestamp_ns(&self) -> u64;
}

impl Stamped for DetectionList {
    fn timestamp_ns(&self) -> u64 {
        self.timestamp_ns
    }
}

impl Stamped for DepthImage {
    fn timestamp_ns(&self) -> u64 {
        self.timestamp_ns
    }
}

/// Pairing of detections with depth frames used by the node.
pub type DetectionDepthSync = ApproximateSync<DetectionList, DepthImage>;

enum Step {
    Pair,
    DropFirst,
    DropSecond,
    Wait,
}

pub struct ApproximateSync<A, B> {
    first: VecDeque<A>,
    second: VecDeque<B>,
    queue_size: usize,
    max_interval_ns: u64,
    n_dropped: usize,
}

impl<A: Stamped, B: Stamped> ApproximateSync<A, B> {
    pub fn new(queue_size: usize, max_interval_ns: u64) -> Self {
        let queue_size = queue_size.max(1);
        Self {
            first: VecDeque::with_capacity(queue_size),
            second: VecDeque::with_capacity(queue_size),
            queue_size,
            max_interval_ns,
            n_dropped: 0,
        }
    }

    pub fn from_config(config: &PublisherConfig) -> Self {
        Self::new(
            config.sync_queue_size,
            config.sync_max_interval_ms.saturating_mul(NS_PER_MS),
        )
    }

    /// Add a message of the first stream; returns every pair it completes.
    pub fn push_first(&mut self, msg: A) -> Vec<(A, B)> {
        if self.first.len() == self.queue_size {
            if let Some(old) = self.first.pop_front() {
                warn!("Sync queue full, dropping message at {}", old.timestamp_ns());
                self.n_dropped += 1;
            }
        }
        self.first.push_back(msg);
        self.drain(false)
    }

    /// Add a message of the second stream; returns every pair it completes.
    pub fn push_second(&mut self, msg: B) -> Vec<(A, B)> {
        if self.second.len() == self.queue_size {
            if let Some(old) = self.second.pop_front() {
                warn!("Sync queue full, dropping message at {}", old.timestamp_ns());
                self.n_dropped += 1;
            }
        }
        self.second.push_back(msg);
        self.drain(false)
    }

    /// End of both streams: settle everything still pending.
    pub fn flush(&mut self) -> Vec<(A, B)> {
        let pairs = self.drain(true);
        self.n_dropped += self.first.len() + self.second.len();
        self.first.clear();
        self.second.clear();
        pairs
    }

    pub fn pending(&self) -> (usize, usize) {
        (self.first.len(), self.second.len())
    }

    /// Messages discarded without a partner so far.
    pub fn n_dropped(&self) -> usize {
        self.n_dropped
    }

    fn drain(&mut self, flushing: bool) -> Vec<(A, B)> {
        let mut pairs = Vec::new();
        loop {
            match self.next_step(flushing) {
                Step::Wait => break,
                Step::Pair => {
                    if let (Some(a), Some(b)) = (self.first.pop_front(), self.second.pop_front()) {
                        pairs.push((a, b));
                    }
                }
                Step::DropFirst => {
                    if let Some(a) = self.first.pop_front() {
                        warn!("Dropping unmatched message at {}", a.timestamp_ns());
                        self.n_dropped += 1;
                    }
                }
                Step::DropSecond => {
                    if let Some(b) = self.second.pop_front() {
                        warn!("Dropping unmatched message at {}", b.timestamp_ns());
                        self.n_dropped += 1;
                    }
                }
            }
        }
        pairs
    }

    fn next_step(&self, flushing: bool) -> Step {
        let (Some(a), Some(b)) = (self.first.front(), self.second.front()) else {
            return Step::Wait;
        };
        let (ta, tb) = (a.timestamp_ns(), b.timestamp_ns());

        if ta <= tb {
            let next = self.first.get(1).map(Stamped::timestamp_ns);
            match resolve(ta, tb, next, self.max_interval_ns, flushing) {
                Some(true) => Step::Pair,
                Some(false) => Step::DropFirst,
                None => Step::Wait,
            }
        } else {
            let next = self.second.get(1).map(Stamped::timestamp_ns);
            match resolve(tb, ta, next, self.max_interval_ns, flushing) {
                Some(true) => Step::Pair,
                Some(false) => Step::DropSecond,
                None => Step::Wait,
            }
        }
    }
}

/// Decide the older head at `older` against the other head at `other`
/// (`older <= other`). `Some(true)` pairs them, `Some(false)` drops the
/// older head, `None` waits for more data.
fn resolve(
    older: u64,
    other: u64,
    older_next: Option<u64>,
    max_interval_ns: u64,
    flushing: bool,
) -> Option<bool> {
    let gap = other - older;
    match older_next {
        // A later message of the same stream is at least as close.
        Some(next) if next <= other => Some(false),
        Some(next) if next - other < gap => Some(false),
        Some(_) => Some(gap <= max_interval_ns),
        None if gap == 0 => Some(true),
        None if gap > max_interval_ns => Some(false),
        None if flushing => Some(true),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Msg(u64);

    impl Stamped for Msg {
        fn timestamp_ns(&self) -> u64 {
            self.0
        }
    }

    fn ms(t: u64) -> Msg {
        Msg(t * NS_PER_MS)
    }

    fn sync() -> ApproximateSync<Msg, Msg> {
        ApproximateSync::new(10, 50 * NS_PER_MS)
    }

    #[test]
    fn test_exact_match_pairs_immediately() {
        let mut s = sync();
        assert!(s.push_first(ms(100)).is_empty());
        assert_eq!(s.push_second(ms(100)), vec![(ms(100), ms(100))]);
        assert_eq!(s.pending(), (0, 0));
    }

    #[test]
    fn test_pair_waits_until_decidable() {
        let mut s = sync();
        s.push_first(ms(0));
        assert!(s.push_second(ms(10)).is_empty());

        // The next detection is further from 10 than 0 is.
        assert_eq!(s.push_first(ms(100)), vec![(ms(0), ms(10))]);
        assert_eq!(s.pending(), (1, 0));
    }

    #[test]
    fn test_closer_later_message_wins() {
        let mut s = sync();
        s.push_first(ms(0));
        s.push_second(ms(40));
        assert!(s.push_first(ms(38)).is_empty());
        assert_eq!(s.n_dropped(), 1);

        assert_eq!(s.flush(), vec![(ms(38), ms(40))]);
    }

    #[test]
    fn test_gap_beyond_interval_is_dropped() {
        let mut s = sync();
        s.push_first(ms(0));
        assert!(s.push_second(ms(100)).is_empty());

        assert_eq!(s.pending(), (0, 1));
        assert_eq!(s.n_dropped(), 1);
        assert_eq!(s.push_first(ms(100)), vec![(ms(100), ms(100))]);
    }

    #[test]
    fn test_interleaved_streams() {
        let mut s = sync();
        let mut pairs = Vec::new();
        for t in [0, 33, 66, 100] {
            pairs.extend(s.push_second(ms(t)));
            pairs.extend(s.push_first(ms(t + 5)));
        }
        pairs.extend(s.flush());

        assert_eq!(
            pairs,
            vec![
                (ms(5), ms(0)),
                (ms(38), ms(33)),
                (ms(71), ms(66)),
                (ms(105), ms(100)),
            ]
        );
        assert_eq!(s.n_dropped(), 0);
    }

    #[test]
    fn test_queue_overflow_evicts_oldest() {
        let mut s: ApproximateSync<Msg, Msg> = ApproximateSync::new(2, 50 * NS_PER_MS);
        s.push_first(ms(0));
        s.push_first(ms(1));
        s.push_first(ms(2));

        assert_eq!(s.pending(), (2, 0));
        assert_eq!(s.n_dropped(), 1);
        assert_eq!(s.push_second(ms(1)), vec![(ms(1), ms(1))]);
    }

    #[test]
    fn test_from_config_converts_interval() {
        let config = PublisherConfig::default();
        let s = DetectionDepthSync::from_config(&config);
        assert_eq!(s.max_interval_ns, 50 * NS_PER_MS);
        assert_eq!(s.queue_size, 1000);
    }
}
